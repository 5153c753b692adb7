//! Settings for token issuance and the request check.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::CsrfError;

/// Smallest accepted random byte length for token ids and secrets.
pub const MIN_TOKEN_BYTE_LENGTH: usize = 16;

/// Configuration for CSRF protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Number of random bytes drawn for the token id and the secret.
    /// Default: 32
    pub token_byte_length: usize,

    /// Validity window from issuance, in milliseconds.
    /// Default: 3_600_000 (1 hour)
    pub token_expiration_ms: u64,

    /// Key mixed into the token HMAC.
    /// Default: None (a random key is drawn per process)
    #[serde(skip_serializing)]
    pub signing_key: Option<String>,

    /// The name of the cookie holding the token id.
    /// Default: "_csrf"
    pub cookie_name: String,

    /// The name of the header that may carry the submitted token.
    /// Default: "x-csrf-token"
    pub header_name: String,

    /// The name of the body field that may carry the submitted token.
    /// Default: "csrf_token"
    pub field_name: String,

    /// Period of the background sweep of expired records, in milliseconds.
    /// Default: 300_000 (5 minutes)
    pub cleanup_interval_ms: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_byte_length: 32,
            token_expiration_ms: 60 * 60 * 1000,
            signing_key: None,
            cookie_name: "_csrf".to_string(),
            header_name: "x-csrf-token".to_string(),
            field_name: "csrf_token".to_string(),
            cleanup_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("token_byte_length", &self.token_byte_length)
            .field("token_expiration_ms", &self.token_expiration_ms)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "***"))
            .field("cookie_name", &self.cookie_name)
            .field("header_name", &self.header_name)
            .field("field_name", &self.field_name)
            .field("cleanup_interval_ms", &self.cleanup_interval_ms)
            .finish()
    }
}

impl CsrfConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the random byte length.
    pub fn token_byte_length(mut self, length: usize) -> Self {
        self.token_byte_length = length;
        self
    }

    /// Set the validity window in milliseconds.
    pub fn token_expiration_ms(mut self, ms: u64) -> Self {
        self.token_expiration_ms = ms;
        self
    }

    /// Set the signing key.
    pub fn signing_key(mut self, key: impl Into<String>) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    /// Set the cookie name.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the header name.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set the body field name.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Set the cleanup period in milliseconds.
    pub fn cleanup_interval_ms(mut self, ms: u64) -> Self {
        self.cleanup_interval_ms = ms;
        self
    }

    pub fn token_expiration(&self) -> Duration {
        Duration::from_millis(self.token_expiration_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Checks the values the service cannot work with.
    pub fn validate(&self) -> Result<(), CsrfError> {
        if self.token_byte_length < MIN_TOKEN_BYTE_LENGTH {
            return Err(CsrfError::InvalidConfig(format!(
                "token_byte_length must be at least {}, got {}",
                MIN_TOKEN_BYTE_LENGTH, self.token_byte_length
            )));
        }
        if self.token_expiration_ms == 0 {
            return Err(CsrfError::InvalidConfig(
                "token_expiration_ms must be greater than zero".to_string(),
            ));
        }
        // Expiry timestamps are signed epoch milliseconds
        if i64::try_from(self.token_expiration_ms).is_err() {
            return Err(CsrfError::InvalidConfig(format!(
                "token_expiration_ms must be at most {}, got {}",
                i64::MAX,
                self.token_expiration_ms
            )));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(CsrfError::InvalidConfig(
                "cleanup_interval_ms must be greater than zero".to_string(),
            ));
        }
        if matches!(&self.signing_key, Some(key) if key.is_empty()) {
            return Err(CsrfError::InvalidConfig(
                "signing_key must not be empty".to_string(),
            ));
        }
        for (label, name) in [
            ("cookie_name", &self.cookie_name),
            ("header_name", &self.header_name),
            ("field_name", &self.field_name),
        ] {
            if name.is_empty() {
                return Err(CsrfError::InvalidConfig(format!(
                    "{} must not be empty",
                    label
                )));
            }
        }
        Ok(())
    }
}
