//! Services - guest aggregation, RSVP submission and reveal sequencing
//!
//! This module contains the core logic:
//! - `aggregator` - Reads the sheet and derives the guest list and headcount
//! - `rsvp` - Validates and submits RSVPs, announces successful submissions
//! - `views` - Headcount and guest-book views with refresh-after-RSVP
//! - `sequencer` - Cancellable timelines, fade-ins and overlay presence
//! - `intro` - The intro splash and the staggered message panel

pub mod aggregator;
pub mod intro;
pub mod rsvp;
pub mod sequencer;
pub mod views;

// Re-export commonly used types
pub use aggregator::{FetchOutcome, GuestAggregator};
pub use intro::{IntroSequence, IntroTiming, MessagePanel, RevealState};
pub use rsvp::{RsvpService, RsvpSubmitted, SubmitError};
pub use sequencer::{FadeIn, Presence, Sequencer, Timeline, TimelineError};
pub use views::{mount_headcount, GuestBookState, GuestBookView, MountedView};
