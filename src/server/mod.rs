//! HTTP server for the LOFERSIL site API.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check with token store statistics
//! - `GET /api/csrf-token`: Issues a CSRF token and sets its cookie
//! - `POST /api/contact`: Contact form submission (CSRF protected)

pub mod contact;
pub mod handlers;
pub mod middleware;
pub mod responses;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::csrf::{CsrfTokenService, TokenStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub csrf: Arc<CsrfTokenService>,
    /// Adds `Secure` to issued cookies
    pub production: bool,
}

impl AppState {
    pub fn new(csrf: CsrfTokenService, production: bool) -> Self {
        Self {
            csrf: Arc::new(csrf),
            production,
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    // Public routes (no CSRF check)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/csrf-token", get(handlers::issue_token));

    // Protected routes (CSRF token required)
    let protected_routes = Router::new()
        .route("/api/contact", post(handlers::submit_contact))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::csrf_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Periodically removes expired tokens so abandoned ones do not pile up.
pub fn spawn_cleanup_task<S>(
    service: Arc<CsrfTokenService<S>>,
    period: Duration,
) -> JoinHandle<()>
where
    S: TokenStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = service.cleanup_expired();
            if removed > 0 {
                tracing::info!("Cleaned up {} expired CSRF token(s)", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::CsrfConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state_with(config: CsrfConfig, production: bool) -> AppState {
        AppState::new(CsrfTokenService::new(config).unwrap(), production)
    }

    fn state() -> AppState {
        state_with(CsrfConfig::new().signing_key("router-test-key"), false)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Fetches a token, returning (cookie pair, token).
    async fn fetch_token(app: &Router) -> (String, String) {
        let response = app
            .clone()
            .oneshot(
                Request::get("/api/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

        let json = body_json(response).await;
        let token = json["data"]["token"].as_str().unwrap().to_string();
        (cookie_pair, token)
    }

    fn contact_json(cookie: Option<&str>, token: Option<&str>) -> Request<Body> {
        let mut body = serde_json::json!({
            "name": "Ana Silva",
            "email": "ana@example.pt",
            "message": "Gostaria de saber mais sobre os vossos produtos.",
        });
        if let Some(token) = token {
            body["csrf_token"] = Value::String(token.to_string());
        }

        let mut builder =
            Request::post("/api/contact").header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["csrf"]["activeTokens"], 0);
        assert!(json["csrf"]["oldestToken"].is_null());
    }

    #[tokio::test]
    async fn test_issue_token_response_and_cookie() {
        let state = state();
        let app = build_router(state.clone());

        let response = app
            .oneshot(
                Request::get("/api/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("_csrf="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains("Path=/"));
        assert!(!set_cookie.contains("Secure"));

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["expiresIn"], 3600);
        assert!(json["data"]["expires"].as_i64().unwrap() > 0);
        assert_eq!(json["data"]["token"].as_str().unwrap().len(), 64);
        assert_eq!(state.csrf.get_stats().active_tokens, 1);
    }

    #[tokio::test]
    async fn test_issue_token_secure_in_production() {
        let app = build_router(state_with(
            CsrfConfig::new().signing_key("k"),
            true,
        ));

        let response = app
            .oneshot(
                Request::get("/api/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(set_cookie.to_str().unwrap().contains("Secure"));
    }

    #[tokio::test]
    async fn test_contact_with_valid_token() {
        let app = build_router(state());
        let (cookie, token) = fetch_token(&app).await;

        let response = app
            .clone()
            .oneshot(contact_json(Some(cookie.as_str()), Some(token.as_str())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_contact_token_replay_rejected() {
        let app = build_router(state());
        let (cookie, token) = fetch_token(&app).await;

        let first = app
            .clone()
            .oneshot(contact_json(Some(cookie.as_str()), Some(token.as_str())))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(contact_json(Some(cookie.as_str()), Some(token.as_str())))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::FORBIDDEN);
        let json = body_json(second).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "CSRF_INVALID");
    }

    #[tokio::test]
    async fn test_contact_without_cookie() {
        let app = build_router(state());
        let (_, token) = fetch_token(&app).await;

        let response = app
            .oneshot(contact_json(None, Some(token.as_str())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "CSRF_MISSING");
    }

    #[tokio::test]
    async fn test_contact_without_token() {
        let app = build_router(state());
        let (cookie, _) = fetch_token(&app).await;

        let response = app
            .oneshot(contact_json(Some(cookie.as_str()), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "CSRF_MISSING");
    }

    #[tokio::test]
    async fn test_contact_with_wrong_token() {
        let app = build_router(state());
        let (cookie, _) = fetch_token(&app).await;

        let response = app
            .oneshot(contact_json(Some(cookie.as_str()), Some("deadbeef")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "CSRF_INVALID");
        // Details stay server side
        assert!(!json["error"].as_str().unwrap().contains("mismatch"));
    }

    #[tokio::test]
    async fn test_contact_with_header_token() {
        let app = build_router(state());
        let (cookie, token) = fetch_token(&app).await;

        let request = Request::post("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie)
            .header("x-csrf-token", token)
            .body(Body::from(
                r#"{"name":"Ana Silva","email":"ana@example.pt","message":"Pedido de informação."}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_contact_form_urlencoded() {
        let app = build_router(state());
        let (cookie, token) = fetch_token(&app).await;

        let body = format!(
            "name=Ana+Silva&email=ana%40example.pt&message=Pedido+de+informa%C3%A7%C3%A3o&csrf_token={}",
            token
        );
        let request = Request::post("/api/contact")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_contact_validation_errors() {
        let app = build_router(state());
        let (cookie, token) = fetch_token(&app).await;

        let body = serde_json::json!({
            "name": "A",
            "email": "not-an-email",
            "message": "hi",
            "csrf_token": token,
        });
        let request = Request::post("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie)
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["details"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_contact_expired_token() {
        let app = build_router(state_with(
            CsrfConfig::new()
                .signing_key("k")
                .token_expiration_ms(10),
            false,
        ));
        let (cookie, token) = fetch_token(&app).await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        let response = app
            .oneshot(contact_json(Some(cookie.as_str()), Some(token.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "CSRF_INVALID");
    }

    #[tokio::test]
    async fn test_sub_second_window_keeps_cookie_alive() {
        let app = build_router(state_with(
            CsrfConfig::new()
                .signing_key("k")
                .token_expiration_ms(900),
            false,
        ));

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("Max-Age=1"));
        assert!(!set_cookie.contains("Max-Age=0"));
        let json = body_json(response).await;
        assert_eq!(json["data"]["expiresIn"], 1);

        // The cookie outlives the window, so a prompt submission passes
        let (cookie, token) = fetch_token(&app).await;
        let response = app
            .oneshot(contact_json(Some(cookie.as_str()), Some(token.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_window_rounds_up_to_whole_seconds() {
        let app = build_router(state_with(
            CsrfConfig::new()
                .signing_key("k")
                .token_expiration_ms(1500),
            false,
        ));

        let response = app
            .oneshot(
                Request::get("/api/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(set_cookie.to_str().unwrap().contains("Max-Age=2"));
        let json = body_json(response).await;
        assert_eq!(json["data"]["expiresIn"], 2);
    }

    #[tokio::test]
    async fn test_contact_body_too_large() {
        let app = build_router(state());

        let request = Request::post("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(vec![b'a'; middleware::MAX_BODY_BYTES + 1]))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_expired() {
        let service = Arc::new(
            CsrfTokenService::new(
                CsrfConfig::new()
                    .signing_key("k")
                    .token_expiration_ms(5),
            )
            .unwrap(),
        );
        service.generate_token().unwrap();

        let handle = spawn_cleanup_task(service.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();

        assert_eq!(service.get_stats().active_tokens, 0);
    }
}
