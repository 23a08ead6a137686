//! Sai Gon Shop Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused. The binary in `main.rs` only adds
//! Sentry, logging and the listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::State,
    http::{Request, StatusCode},
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Directory the `/static` route serves from.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the full application router.
///
/// Layers, innermost first: sessions, security headers, request ID,
/// request tracing, then Sentry outermost for full request coverage.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::security_headers_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend API is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.api().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness check failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, LOCATION};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ApiConfig, SentryConfig, StorefrontConfig};

    /// State whose backend is a closed local port, so every API call fails fast.
    fn state() -> AppState {
        AppState::new(StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            api: ApiConfig {
                base_url: url::Url::parse("http://127.0.0.1:9/api/v1/").unwrap(),
                timeout: Duration::from_millis(200),
            },
            vnpay_hash_secret: None,
            sentry: SentryConfig {
                dsn: None,
                environment: None,
                sample_rate: 1.0,
                traces_sample_rate: 0.0,
            },
        })
        .unwrap()
    }

    async fn get(uri: &str) -> axum::response::Response {
        app(state())
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_readiness_fails_without_backend() {
        assert_eq!(get("/health/ready").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_cart_renders() {
        let response = get("/cart").await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_checkout_requires_login() {
        let response = get("/checkout").await;
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[LOCATION], "/auth/login?next=%2Fcheckout");
    }

    #[tokio::test]
    async fn test_htmx_account_redirect_uses_header() {
        let response = app(state())
            .oneshot(
                axum::http::Request::builder()
                    .uri("/account/orders")
                    .header("hx-request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["HX-Redirect"], "/auth/login?next=%2Faccount%2Forders");
    }

    #[tokio::test]
    async fn test_home_degrades_without_backend() {
        assert_eq!(get("/").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        assert_eq!(get("/auth/login?next=/checkout").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_count_fragment() {
        let response = get("/cart/count").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
