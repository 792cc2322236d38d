//! RSVP form input and the validated submission sent to the form endpoint

use serde::Serialize;

/// The invitation admits one guest per submission; the form does not expose it.
pub const FIXED_GUEST_COUNT: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpField {
    Name,
    Email,
    Guests,
    Message,
}

impl RsvpField {
    pub fn label(&self) -> &'static str {
        match self {
            RsvpField::Name => "Full Name",
            RsvpField::Email => "Email",
            RsvpField::Guests => "Number Of Guests",
            RsvpField::Message => "Message",
        }
    }
}

impl std::fmt::Display for RsvpField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(RsvpField),
}

/// Raw form input as typed by the guest
#[derive(Debug, Clone, Default)]
pub struct RsvpForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl RsvpForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), email: email.into(), message: message.into() }
    }

    /// Name and email are required; the message is optional
    pub fn validate(self) -> Result<RsvpSubmission, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Required(RsvpField::Name));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::Required(RsvpField::Email));
        }

        Ok(RsvpSubmission {
            name: name.to_string(),
            email: email.to_string(),
            guests: FIXED_GUEST_COUNT.to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

/// A validated RSVP, ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RsvpSubmission {
    name: String,
    email: String,
    guests: String,
    message: String,
}

impl RsvpSubmission {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn guests(&self) -> &str {
        &self.guests
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn value(&self, field: RsvpField) -> &str {
        match field {
            RsvpField::Name => &self.name,
            RsvpField::Email => &self.email,
            RsvpField::Guests => &self.guests,
            RsvpField::Message => &self.message,
        }
    }
}
