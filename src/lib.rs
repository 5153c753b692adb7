//! LOFERSIL site server
//!
//! CSRF-protected contact form API for the LOFERSIL landing page.

pub mod config;
pub mod csrf;
pub mod server;

pub use config::{Config, ConfigError, ConfigSource, ConfigValue};
pub use csrf::{CsrfConfig, CsrfError, CsrfRejection, CsrfTokenService, IssuedToken, TokenStats};
pub use server::{build_router, spawn_cleanup_task, AppState};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
