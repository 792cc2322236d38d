//! Domain models - guest rows, RSVP submissions, countdown
//!
//! This module contains the data types shared by the read and write paths:
//! - `RowTable` / `GuestEntry` - the RSVP sheet and its parsed rows
//! - `GuestSnapshot` - guests newest-first plus the aggregate headcount
//! - `RsvpForm` / `RsvpSubmission` - guest input and its validated form
//! - `TimeLeft` - countdown to the ceremony

pub mod countdown;
pub mod guest;
pub mod rsvp;

// Re-export commonly used types at module level
pub use countdown::TimeLeft;
pub use guest::{GuestEntry, GuestSnapshot, HeaderIndex, RowTable};
pub use rsvp::{RsvpField, RsvpForm, RsvpSubmission, ValidationError};
