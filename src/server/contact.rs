//! Contact form payload and its validation.

use serde::{Deserialize, Serialize};

const NAME_LEN: (usize, usize) = (2, 100);
const EMAIL_MAX_LEN: usize = 254;
const MESSAGE_LEN: (usize, usize) = (10, 5000);

/// Raw submission as received. Unknown fields (like the CSRF field) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// A submission that passed validation, with whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// A single field problem reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl ContactForm {
    /// Validates every field, collecting all problems.
    pub fn validate(&self) -> Result<ContactSubmission, Vec<FieldError>> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();
        let mut errors = Vec::new();

        let name_len = name.chars().count();
        if name_len < NAME_LEN.0 || name_len > NAME_LEN.1 {
            errors.push(FieldError::new(
                "name",
                format!(
                    "Name must be between {} and {} characters",
                    NAME_LEN.0, NAME_LEN.1
                ),
            ));
        }

        if email.is_empty() {
            errors.push(FieldError::new("email", "Email is required"));
        } else if email.len() > EMAIL_MAX_LEN || !is_plausible_email(email) {
            errors.push(FieldError::new("email", "Email address is not valid"));
        }

        let message_len = message.chars().count();
        if message_len < MESSAGE_LEN.0 || message_len > MESSAGE_LEN.1 {
            errors.push(FieldError::new(
                "message",
                format!(
                    "Message must be between {} and {} characters",
                    MESSAGE_LEN.0, MESSAGE_LEN.1
                ),
            ));
        }

        if errors.is_empty() {
            Ok(ContactSubmission {
                name: name.to_string(),
                email: email.to_string(),
                message: message.to_string(),
            })
        } else {
            Err(errors)
        }
    }
}

/// One `@`, a non-empty local part, and a dotted domain without whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
}
