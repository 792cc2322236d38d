//! IO modules - external system interfaces
//!
//! This module contains the two third-party endpoints:
//! - `sheet` - read endpoint serving the RSVP sheet as JSON
//! - `form` - write endpoint accepting multipart RSVP posts

pub mod form;
pub mod sheet;

// Re-export commonly used types
pub use form::{FormError, HttpFormWriter, RsvpSink};
pub use sheet::{decode_payload, HttpSheetReader, RowSource, SheetError};
