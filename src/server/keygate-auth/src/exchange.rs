//! Identity assertion to session token exchange.

use std::sync::Arc;

use keygate_token::{SessionCodec, SessionGrant, TokenError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AuthError, IdentityVerifier, UserDirectory};

/// Caller-supplied scoping for a new session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequest {
    /// Organization id. Empty means "no organization scoping".
    pub organization_id: String,
    /// Requested permissions, kept in order.
    pub permissions: Vec<String>,
}

impl ScopeRequest {
    /// Creates a scope for `organization_id` with `permissions`.
    pub fn new(organization_id: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            permissions,
        }
    }
}

/// Outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchanged {
    /// Signed session token.
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Turns verified identity assertions into session tokens.
///
/// Every stage is a hard stop: the first failure is returned and nothing
/// is retried.
#[derive(Clone)]
pub struct Exchanger {
    verifier: Arc<dyn IdentityVerifier>,
    directory: Arc<dyn UserDirectory>,
    codec: Arc<SessionCodec>,
}

impl Exchanger {
    /// Creates an exchanger from its collaborators.
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        directory: Arc<dyn UserDirectory>,
        codec: Arc<SessionCodec>,
    ) -> Self {
        Self {
            verifier,
            directory,
            codec,
        }
    }

    /// Verifies `assertion` and issues a session token scoped by `scope`.
    pub async fn exchange(
        &self,
        assertion: &str,
        scope: &ScopeRequest,
    ) -> Result<Exchanged, AuthError> {
        info!(
            organization_id = %scope.organization_id,
            verifier = self.verifier.name(),
            "Session exchange requested"
        );

        let identity = self.verifier.verify(assertion).await.map_err(|e| {
            warn!(error = %e, "Identity assertion rejected");
            match e {
                AuthError::InvalidAssertion(detail) => AuthError::InvalidAssertion(detail),
                other => AuthError::InvalidAssertion(other.to_string()),
            }
        })?;

        let user = self.directory.lookup(&identity).await.map_err(|e| {
            warn!(uid = %identity.uid, error = %e, "User lookup failed");
            match e {
                AuthError::UserLookupFailed(detail) => AuthError::UserLookupFailed(detail),
                other => AuthError::UserLookupFailed(other.to_string()),
            }
        })?;

        let mut grant = SessionGrant::new(user.uid, scope.organization_id.clone())
            .with_permissions(scope.permissions.iter().cloned());
        grant.email = user.email;

        let issued = self.codec.encode(&grant).map_err(|e| {
            warn!(uid = %grant.subject, error = %e, "Session token not issued");
            match e {
                TokenError::Configuration(detail) => AuthError::Configuration(detail),
                other => AuthError::Signing(other.to_string()),
            }
        })?;

        info!(
            uid = %grant.subject,
            organization_id = %grant.organization_id,
            expires_in = issued.expires_in,
            "Session token issued"
        );

        Ok(Exchanged {
            token: issued.token,
            expires_in: issued.expires_in,
        })
    }
}
