//! Authentication context types.

use keygate_token::SessionClaims;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authenticated request context.
///
/// Built by the access gate from a validated session token and passed to
/// handlers for the duration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Subject identifier (from the `uid` claim).
    pub subject: String,

    /// Organization the session is scoped to. Never empty.
    pub organization_id: String,

    /// Email address, if the token carries one.
    pub email: Option<String>,

    /// `roles` claim, passed through verbatim when present.
    pub roles: Option<Value>,

    /// Permissions granted at exchange time.
    pub permissions: Vec<String>,

    /// Token expiration timestamp (Unix seconds).
    pub expires_at: u64,
}

impl AuthContext {
    /// Builds a context from validated claims and the organization the gate accepted.
    pub fn from_claims(claims: SessionClaims, organization_id: String) -> Self {
        let roles = claims.extra.get("roles").cloned();
        Self {
            subject: claims.subject,
            organization_id,
            email: claims.email,
            roles,
            permissions: claims.permissions,
            expires_at: claims.exp,
        }
    }
}
