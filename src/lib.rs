//! invite-rsvp library
//!
//! RSVP and guest-book core of a wedding invitation: reads the RSVP sheet,
//! aggregates the headcount, submits RSVPs and sequences timed reveals.
//! Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
