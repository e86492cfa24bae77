//! Access gate.
//!
//! Decides, per request, whether an `Authorization` header carries a usable
//! session token. The outcome is one of four states:
//!
//! - `NoHeader` - header absent or empty
//! - `MalformedHeader` - header present but not `Bearer <token>`
//! - `Invalid` - token failed to decode
//! - `Valid` - token decoded and scoped to a non-empty organization
//!
//! A decoded token without an organization is rejected here even though
//! the codec accepts an empty organization id.

use std::sync::Arc;

use keygate_token::{unix_now, SessionCodec, TokenError};
use thiserror::Error;

use crate::AuthContext;

/// Required `Authorization` scheme prefix (case-sensitive, one space).
pub const BEARER_PREFIX: &str = "Bearer ";

/// Why the gate refused a request. Every variant maps to HTTP 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    /// No `Authorization` header, or an empty one.
    #[error("Authorization header is required")]
    NoHeader,

    /// Header does not use the bearer scheme.
    #[error("Authorization header must be in the format 'Bearer {{token}}'")]
    MalformedHeader,

    /// Session token failed validation.
    #[error("Invalid token: {0}")]
    Invalid(TokenError),

    /// Session token carries no organization, or an empty one.
    #[error("Token missing organization ID")]
    MissingOrganization,
}

impl GateRejection {
    /// Short state name for logs.
    pub fn state(&self) -> &'static str {
        match self {
            Self::NoHeader => "no_header",
            Self::MalformedHeader => "malformed_header",
            Self::Invalid(_) => "invalid",
            Self::MissingOrganization => "missing_organization",
        }
    }
}

/// Strips the bearer prefix. `None` when the header uses another scheme.
pub fn extract_bearer(header: &str) -> Option<&str> {
    header.strip_prefix(BEARER_PREFIX)
}

/// Request-time gatekeeper for session tokens.
#[derive(Debug, Clone)]
pub struct Gate {
    codec: Arc<SessionCodec>,
}

impl Gate {
    /// Creates a gate validating tokens with `codec`.
    pub fn new(codec: Arc<SessionCodec>) -> Self {
        Self { codec }
    }

    /// Evaluates the raw `Authorization` header value.
    pub fn authorize(&self, header: Option<&[u8]>) -> Result<AuthContext, GateRejection> {
        self.authorize_at(header, unix_now())
    }

    /// Evaluates the header as if the current time were `now`.
    pub fn authorize_at(
        &self,
        header: Option<&[u8]>,
        now: u64,
    ) -> Result<AuthContext, GateRejection> {
        let header = header
            .filter(|value| !value.is_empty())
            .ok_or(GateRejection::NoHeader)?;
        let header = std::str::from_utf8(header).map_err(|_| GateRejection::MalformedHeader)?;
        let token = extract_bearer(header).ok_or(GateRejection::MalformedHeader)?;

        let claims = self
            .codec
            .decode_at(token, now)
            .map_err(GateRejection::Invalid)?;

        let organization_id = claims
            .organization()
            .map(String::from)
            .ok_or(GateRejection::MissingOrganization)?;

        Ok(AuthContext::from_claims(claims, organization_id))
    }
}
