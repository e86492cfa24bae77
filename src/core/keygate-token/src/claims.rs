//! Session claim types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input to [`SessionCodec::encode`](crate::SessionCodec::encode).
///
/// The organization id is always a string. An empty string means
/// "no organization scoping" and is written to the token as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Stable subject identifier of the external account.
    pub subject: String,
    /// Email address, when the identity provider supplied one.
    pub email: Option<String>,
    /// Organization the session is scoped to (may be empty).
    pub organization_id: String,
    /// Capability names granted to the session, in request order.
    pub permissions: Vec<String>,
}

impl SessionGrant {
    /// Creates a grant for `subject` scoped to `organization_id`.
    pub fn new(subject: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            organization_id: organization_id.into(),
            permissions: Vec::new(),
        }
    }

    /// Sets the email claim.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the permission list.
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

/// Claims carried inside a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (external account id).
    #[serde(rename = "uid")]
    pub subject: String,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Organization id.
    ///
    /// `Some("")` is an explicit "no organization"; `None` means the field
    /// was absent from the payload. Tokens issued by this crate always
    /// carry the field.
    #[serde(default)]
    pub org_id: Option<String>,

    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Issued at (Unix seconds).
    pub iat: u64,

    /// Expiration (Unix seconds).
    pub exp: u64,

    /// Non-canonical claims passed through untouched (e.g. `roles`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    /// Returns the organization id if present and non-empty.
    pub fn organization(&self) -> Option<&str> {
        self.org_id.as_deref().filter(|org| !org.is_empty())
    }

    /// Returns a passthrough claim by name.
    pub fn extra_claim(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Seconds of validity left at `now`, zero once expired.
    pub fn remaining_secs(&self, now: u64) -> u64 {
        self.exp.saturating_sub(now)
    }
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Compact JWS string.
    pub token: String,
    /// The claims that were signed.
    pub claims: SessionClaims,
    /// Lifetime in seconds (`lifetime_hours * 3600`).
    pub expires_in: u64,
}
