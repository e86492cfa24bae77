//! # Keygate API
//!
//! REST layer for Keygate.
//!
//! ## Endpoints
//!
//! - `POST /api/v1/auth/verify` - Verify an identity assertion
//! - `POST /api/v1/auth/generate-jwt` - Exchange an identity assertion for a session token
//! - `GET /api/v1/permissions` - Permissions of the bearer session (gated)
//! - `GET /health` - Liveness probe

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/permissions", get(handlers::get_permissions))
        .route_layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/auth/verify", post(handlers::verify_token))
        .route("/api/v1/auth/generate-jwt", post(handlers::generate_jwt))
        .merge(protected)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
