//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keygate_auth::{AuthError, GateRejection};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned to HTTP callers as `{"error": "<reason>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or header has the wrong shape (400).
    #[error("{0}")]
    BadRequest(String),

    /// Authentication failed (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Server-side failure (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidAssertion(_) => Self::Unauthorized(err.to_string()),
            AuthError::UserLookupFailed(_)
            | AuthError::Configuration(_)
            | AuthError::Signing(_)
            | AuthError::PermissionLookup(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<GateRejection> for ApiError {
    fn from(rejection: GateRejection) -> Self {
        Self::Unauthorized(rejection.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
