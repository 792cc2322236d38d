//! Write endpoint: multipart POST to the RSVP form
//!
//! The form host does not let callers read its response, so delivery is
//! fire-and-forget. Only failing to send at all is an error.

use crate::domain::rsvp::{RsvpField, RsvpSubmission};
use crate::infra::config::{Config, FormFields};
use async_trait::async_trait;
use reqwest::multipart::Form;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("form request failed: {0}")]
    Transport(String),
    #[error("form request timed out after {0:?}")]
    Timeout(Duration),
}

/// Anything that accepts an RSVP row
#[async_trait]
pub trait RsvpSink: Send + Sync {
    async fn write(&self, submission: &RsvpSubmission) -> Result<(), FormError>;
}

const FIELD_ORDER: [RsvpField; 4] = [RsvpField::Name, RsvpField::Email, RsvpField::Guests, RsvpField::Message];

/// Form key/value pairs in submission order
pub fn form_pairs(fields: &FormFields, submission: &RsvpSubmission) -> Vec<(String, String)> {
    FIELD_ORDER
        .iter()
        .map(|&field| {
            let key = match field {
                RsvpField::Name => &fields.name,
                RsvpField::Email => &fields.email,
                RsvpField::Guests => &fields.guests,
                RsvpField::Message => &fields.message,
            };
            (key.clone(), submission.value(field).to_string())
        })
        .collect()
}

pub struct HttpFormWriter {
    url: String,
    fields: FormFields,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpFormWriter {
    pub fn new(config: &Config) -> Result<Self, FormError> {
        let timeout = config.form_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FormError::Transport(e.to_string()))?;

        Ok(Self {
            url: config.form_submit_url().to_string(),
            fields: config.form_fields().clone(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl RsvpSink for HttpFormWriter {
    async fn write(&self, submission: &RsvpSubmission) -> Result<(), FormError> {
        let start = Instant::now();
        let form = form_pairs(&self.fields, submission)
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value));

        let response = self.client.post(&self.url).multipart(form).send().await.map_err(|e| {
            if e.is_timeout() {
                FormError::Timeout(self.timeout)
            } else {
                FormError::Transport(e.to_string())
            }
        })?;

        // Status is not meaningful for this endpoint; logged only.
        debug!(
            status = %response.status().as_u16(),
            latency_us = %start.elapsed().as_micros(),
            "form_post_sent"
        );
        Ok(())
    }
}
