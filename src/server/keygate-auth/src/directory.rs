//! User directory lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AuthError, ValidatedIdentity};

/// Resolved identity record for a verified subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Subject identifier.
    pub uid: String,
    /// Primary email address.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Whether the provider verified the email address.
    pub email_verified: bool,
}

/// Trait for resolving user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves the record of a verified identity.
    async fn lookup(&self, identity: &ValidatedIdentity) -> Result<UserRecord, AuthError>;
}

/// Directory that builds records from the verified provider claims.
///
/// Firebase ID tokens carry `email`, `email_verified` and `name`, so no
/// second round-trip to the provider is needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaimsDirectory;

#[async_trait]
impl UserDirectory for ClaimsDirectory {
    async fn lookup(&self, identity: &ValidatedIdentity) -> Result<UserRecord, AuthError> {
        if identity.uid.is_empty() {
            return Err(AuthError::UserLookupFailed(
                "no user record for an empty subject".into(),
            ));
        }

        Ok(UserRecord {
            uid: identity.uid.clone(),
            email: identity.email().map(String::from),
            display_name: identity.claim_str("name").map(String::from),
            email_verified: identity
                .claims
                .get("email_verified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}
