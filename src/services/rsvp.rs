//! RSVP submission and the notification that follows it
//!
//! A successful submission is announced on a broadcast channel. Views that
//! show guest data subscribe to it and refresh after a settle delay.

use crate::domain::rsvp::{RsvpForm, ValidationError};
use crate::infra::metrics::Metrics;
use crate::io::form::{FormError, RsvpSink};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub const GENERIC_SUBMIT_ERROR: &str = "Something went wrong. Please try again.";

/// Capacity for pending notifications per subscriber
const EVENT_BUFFER: usize = 16;

/// Announced after an RSVP was handed to the form endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvpSubmitted;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Something went wrong. Please try again.")]
    Delivery(#[source] FormError),
}

impl SubmitError {
    /// Text to show the guest
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Invalid(e) => e.to_string(),
            SubmitError::Delivery(_) => GENERIC_SUBMIT_ERROR.to_string(),
        }
    }
}

pub struct RsvpService<W> {
    sink: W,
    events: broadcast::Sender<RsvpSubmitted>,
    metrics: Arc<Metrics>,
}

impl<W: RsvpSink> RsvpService<W> {
    pub fn new(sink: W, metrics: Arc<Metrics>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { sink, events, metrics }
    }

    /// Receive a notification after every successful submission
    pub fn subscribe(&self) -> broadcast::Receiver<RsvpSubmitted> {
        self.events.subscribe()
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub async fn submit(&self, form: RsvpForm) -> Result<(), SubmitError> {
        let submission = match form.validate() {
            Ok(submission) => submission,
            Err(e) => {
                self.metrics.record_submission_failure();
                warn!(error = %e, "rsvp_rejected");
                return Err(e.into());
            }
        };

        if let Err(e) = self.sink.write(&submission).await {
            self.metrics.record_submission_failure();
            warn!(error = %e, "rsvp_submit_failed");
            return Err(SubmitError::Delivery(e));
        }

        self.metrics.record_submission();
        // No subscribers is fine; nobody is showing guest data.
        let listeners = self.events.send(RsvpSubmitted).unwrap_or(0);
        info!(name = %submission.name(), listeners = listeners, "rsvp_submitted");
        Ok(())
    }
}
