//! Route handlers.

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};

use super::contact::ContactForm;
use super::responses::{ContactResponse, ErrorBody, HealthResponse, TokenData, TokenResponse};
use super::AppState;
use crate::csrf::{now_millis, IssuedToken};

/// Health check endpoint. Sweeps expired tokens before reporting.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    state.csrf.cleanup_expired();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        csrf: state.csrf.get_stats(),
    })
}

/// Issues a token: the id goes into an HTTP-only cookie, the token into the body.
pub async fn issue_token(State(state): State<AppState>) -> Response {
    let issued = match state.csrf.generate_token() {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!("Failed to generate CSRF token: {}", e);
            return generation_error(e.code());
        }
    };

    // Rounded up so a sub-second window never yields `Max-Age=0`
    let expires_in = state.csrf.get_config().token_expiration_ms.div_ceil(1000);
    let set_cookie = match token_cookie(&state, &issued, expires_in) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to build CSRF cookie: {}", e);
            return generation_error("CSRF_GENERATION_ERROR");
        }
    };

    let mut response = Json(TokenResponse {
        success: true,
        data: TokenData {
            token: issued.token,
            expires: issued.expires,
            expires_in,
        },
    })
    .into_response();

    let headers = response.headers_mut();
    headers.insert(header::SET_COOKIE, set_cookie);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn token_cookie(
    state: &AppState,
    issued: &IssuedToken,
    max_age_secs: u64,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let config = state.csrf.get_config();
    let cookie = Cookie::build((config.cookie_name.clone(), issued.token_id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.production)
        .max_age(CookieDuration::seconds(
            i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        ))
        .build();

    HeaderValue::from_str(&cookie.to_string())
}

fn generation_error(code: &'static str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Failed to generate security token", code)),
    )
        .into_response()
}

/// Contact form submission. Runs behind the CSRF middleware.
///
/// Accepts JSON or urlencoded bodies. Delivery happens elsewhere; accepted
/// submissions are logged.
pub async fn submit_contact(request: Request) -> Response {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let form = if is_form {
        Form::<ContactForm>::from_request(request, &())
            .await
            .map(|Form(form)| form)
            .map_err(|e| e.body_text())
    } else {
        Json::<ContactForm>::from_request(request, &())
            .await
            .map(|Json(form)| form)
            .map_err(|e| e.body_text())
    };

    let form = match form {
        Ok(form) => form,
        Err(e) => {
            tracing::debug!("Malformed contact submission: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new("Malformed request body", "INVALID_BODY")),
            )
                .into_response();
        }
    };

    match form.validate() {
        Ok(submission) => {
            tracing::info!(
                received_at = now_millis(),
                message_chars = submission.message.chars().count(),
                "Contact form submission accepted"
            );
            Json(ContactResponse {
                success: true,
                message: "Thank you for your message. We will get back to you soon.",
            })
            .into_response()
        }
        Err(errors) => (
            StatusCode::BAD_REQUEST,
            Json(
                ErrorBody::new("Please correct the highlighted fields", "VALIDATION_ERROR")
                    .with_details(errors),
            ),
        )
            .into_response(),
    }
}
