//! Session gate middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use keygate_auth::Gate;
use tracing::debug;

use crate::error::ApiError;

/// Requires a valid bearer session token.
///
/// On success the [`AuthContext`](keygate_auth::AuthContext) is inserted
/// into the request extensions. Rejections are answered with 401.
pub async fn require_session(State(gate): State<Gate>, mut req: Request, next: Next) -> Response {
    let header = req.headers().get(AUTHORIZATION).map(|v| v.as_bytes());

    match gate.authorize(header) {
        Ok(ctx) => {
            debug!(subject = %ctx.subject, organization_id = %ctx.organization_id, "Session accepted");
            req.extensions_mut().insert(ctx);
            next.run(req).await
        },
        Err(rejection) => {
            debug!(state = rejection.state(), reason = %rejection, "Session rejected");
            ApiError::from(rejection).into_response()
        },
    }
}
