//! Web server module.
//!
//! Routes:
//! - `GET /health`
//! - `GET /csrf-token` issues a single-use anti-forgery token
//! - `POST /submit` (and `/submit/`) runs the submission pipeline
//!
//! Cross-origin access is limited to the configured origin allow-list.

pub mod handlers;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use handlers::{
    csrf_token, health, submit, AppState, CsrfTokenResponse, HealthResponse, SubmitResponse,
    CSRF_HEADER,
};

/// Build the application router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(health))
        .route("/csrf-token", get(csrf_token))
        .route("/submit", post(submit))
        .route("/submit/", post(submit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    let csrf = HeaderName::from_static(CSRF_HEADER);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, csrf.clone()])
        .expose_headers([csrf])
        .allow_credentials(true)
}
