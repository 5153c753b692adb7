//! Framework-agnostic request validation hook.
//!
//! Callers hand over the pieces of an incoming request; the hook decides
//! whether it passes. The axum adapter lives in `server::middleware`.

use cookie::Cookie;
use http::Method;

use super::service::CsrfTokenService;
use super::tokens::TokenStore;

/// The parts of a request the CSRF check looks at.
#[derive(Debug, Clone, Copy)]
pub struct CsrfRequest<'a> {
    pub method: &'a Method,
    /// Raw `Cookie` header value, all cookie headers joined with `; `.
    pub cookie_header: Option<&'a str>,
    /// Value of the configured token header.
    pub header_token: Option<&'a str>,
    /// Value of the configured body field.
    pub body_token: Option<&'a str>,
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfRejection {
    /// Cookie or submitted token absent.
    Missing,
    /// Present but wrong, expired or already used.
    Invalid,
}

impl CsrfRejection {
    pub fn code(&self) -> &'static str {
        match self {
            CsrfRejection::Missing => "CSRF_MISSING",
            CsrfRejection::Invalid => "CSRF_INVALID",
        }
    }

    /// Client-facing message. Deliberately vague.
    pub fn message(&self) -> &'static str {
        match self {
            CsrfRejection::Missing => "Security token missing. Please reload the page and try again.",
            CsrfRejection::Invalid => "Security token invalid or expired. Please reload the page and try again.",
        }
    }
}

impl std::fmt::Display for CsrfRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::error::Error for CsrfRejection {}

/// `GET`, `HEAD` and `OPTIONS` never change state and skip validation.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Finds a cookie by name in a raw `Cookie` header value.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(cookie_header)
        .filter_map(|c| c.ok())
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

impl<S: TokenStore> CsrfTokenService<S> {
    /// Checks a request, consuming its token on success.
    ///
    /// The token id comes from the configured cookie; the submitted token
    /// from the body field, falling back to the header.
    pub fn check_request(&self, request: &CsrfRequest<'_>) -> Result<(), CsrfRejection> {
        if is_safe_method(request.method) {
            return Ok(());
        }

        let config = self.get_config();
        let token_id = request
            .cookie_header
            .and_then(|header| cookie_value(header, &config.cookie_name))
            .filter(|id| !id.is_empty());
        let submitted = request
            .body_token
            .filter(|t| !t.is_empty())
            .or(request.header_token.filter(|t| !t.is_empty()));

        let (Some(token_id), Some(submitted)) = (token_id, submitted) else {
            tracing::warn!(method = %request.method, "CSRF token missing");
            return Err(CsrfRejection::Missing);
        };

        if self.validate_token(&token_id, submitted) {
            Ok(())
        } else {
            tracing::warn!(method = %request.method, "CSRF token rejected");
            Err(CsrfRejection::Invalid)
        }
    }
}
