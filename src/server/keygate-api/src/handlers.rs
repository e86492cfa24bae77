//! Request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use keygate_auth::{AuthContext, ScopeRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// API Types
// ============================================================================

/// Body of `POST /api/v1/auth/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    /// Identity assertion to verify.
    pub token: String,
}

/// Response of `POST /api/v1/auth/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    /// Verified subject.
    pub uid: String,
    /// `email` claim, `null` when absent.
    pub email: Value,
    /// All provider claims.
    pub claims: Map<String, Value>,
}

/// Body of `POST /api/v1/auth/generate-jwt`.
#[derive(Debug, Deserialize)]
pub struct GenerateJwtRequest {
    /// Identity assertion issued by Firebase.
    pub firebase_token: String,
    /// Organization scope. Absent means no organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Requested permissions.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Response of `POST /api/v1/auth/generate-jwt`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Session token.
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Response of `GET /api/v1/permissions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionsResponse {
    /// Subject of the session.
    pub user_id: String,
    /// Organization of the session.
    pub organization_id: String,
    /// `roles` claim, verbatim.
    pub roles: Option<Value>,
    /// Permissions from the catalog.
    pub permissions: Vec<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Verifies an identity assertion and echoes its claims.
pub async fn verify_token(
    State(state): State<AppState>,
    body: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    let Json(req) = body?;
    require("token", &req.token)?;

    let identity = state.verifier.verify(&req.token).await?;
    let email = identity.claims.get("email").cloned().unwrap_or(Value::Null);

    Ok(Json(VerifyTokenResponse {
        uid: identity.uid,
        email,
        claims: identity.claims,
    }))
}

/// Exchanges a Firebase ID token for a session token.
pub async fn generate_jwt(
    State(state): State<AppState>,
    body: Result<Json<GenerateJwtRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = body?;
    require("firebase_token", &req.firebase_token)?;

    let scope = ScopeRequest::new(
        req.organization_id.unwrap_or_default(),
        req.permissions.unwrap_or_default(),
    );
    info!(organization_id = %scope.organization_id, "Session token requested");

    let exchanged = state.exchanger.exchange(&req.firebase_token, &scope).await?;

    Ok(Json(TokenResponse {
        token: exchanged.token,
        expires_in: exchanged.expires_in,
    }))
}

/// Lists the permissions of the authenticated session.
pub async fn get_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<PermissionsResponse>, ApiError> {
    let permissions = state.catalog.permissions_for(&ctx).await?;

    Ok(Json(PermissionsResponse {
        user_id: ctx.subject,
        organization_id: ctx.organization_id,
        roles: ctx.roles,
        permissions,
    }))
}
