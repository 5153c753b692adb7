//! CSRF error types.

use thiserror::Error;

/// Errors raised by the token service itself.
///
/// Invalid client input is never an error; validation signals it with
/// `false` or a [`CsrfRejection`](super::CsrfRejection).
#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Failed to generate CSRF token: {0}")]
    Generation(String),

    #[error("Invalid CSRF configuration: {0}")]
    InvalidConfig(String),
}

impl CsrfError {
    /// Machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            CsrfError::Generation(_) => "CSRF_GENERATION_ERROR",
            CsrfError::InvalidConfig(_) => "CSRF_CONFIG_ERROR",
        }
    }
}
