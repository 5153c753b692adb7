//! CSRF protection.
//!
//! Tokens are issued as a pair: an id placed in an HTTP-only cookie and an
//! HMAC value the client submits in a form field or header. A submission
//! passes when both are present and match a stored, unexpired record, which
//! is then consumed.
//!
//! # Example
//!
//! ```rust,no_run
//! use lofersil::csrf::{CsrfConfig, CsrfTokenService};
//!
//! let service = CsrfTokenService::new(CsrfConfig::new().signing_key("key")).unwrap();
//! let issued = service.generate_token().unwrap();
//! assert!(service.validate_token(&issued.token_id, &issued.token));
//! ```

mod config;
mod error;
mod guard;
mod service;
mod tokens;

pub use config::{CsrfConfig, MIN_TOKEN_BYTE_LENGTH};
pub use error::CsrfError;
pub use guard::{cookie_value, is_safe_method, CsrfRejection, CsrfRequest};
pub use service::{generate_signing_key, CsrfTokenService, IssuedToken, SIGNING_KEY_BYTES};
pub use tokens::{now_millis, MemoryTokenStore, TokenRecord, TokenStats, TokenStore};
