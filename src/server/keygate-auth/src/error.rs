//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while verifying identities or issuing sessions.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity assertion was rejected by the verifier.
    #[error("invalid identity assertion: {0}")]
    InvalidAssertion(String),

    /// The user record for a verified subject could not be resolved.
    #[error("user lookup failed: {0}")]
    UserLookupFailed(String),

    /// Signing configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The session token could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The permission catalog could not answer.
    #[error("permission lookup failed: {0}")]
    PermissionLookup(String),
}
