//! CSRF middleware for axum.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::responses::ErrorBody;
use super::AppState;
use crate::csrf::{is_safe_method, CsrfRejection, CsrfRequest};

/// Largest body the middleware will buffer to look for the token field.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Validates the CSRF token on state-changing requests.
///
/// The body is buffered to read the token field and handed on unchanged.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer request body: {}", e);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorBody::new("Request body too large", "PAYLOAD_TOO_LARGE")),
            )
                .into_response();
        }
    };

    let config = state.csrf.get_config();
    let cookie_header = joined_cookies(&parts.headers);
    let body_token = body_field(&parts.headers, &bytes, &config.field_name);
    let header_token = parts
        .headers
        .get(config.header_name.as_str())
        .and_then(|v| v.to_str().ok());

    let result = state.csrf.check_request(&CsrfRequest {
        method: &parts.method,
        cookie_header: cookie_header.as_deref(),
        header_token,
        body_token: body_token.as_deref(),
    });

    match result {
        Ok(()) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Err(rejection) => rejection_response(rejection),
    }
}

/// 403 with the rejection code and a generic message.
pub fn rejection_response(rejection: CsrfRejection) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorBody::new(rejection.message(), rejection.code())),
    )
        .into_response()
}

/// All `Cookie` headers as one string.
fn joined_cookies(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// Reads a string field from a JSON or urlencoded body.
fn body_field(headers: &HeaderMap, body: &Bytes, field: &str) -> Option<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        value.get(field)?.as_str().map(str::to_string)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
        pairs
            .into_iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value)
    } else {
        None
    }
}
