//! Identity verifier trait.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::AuthError;

/// Result of verifying an identity assertion.
///
/// Created per verification call and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedIdentity {
    /// Stable subject identifier of the external account.
    pub uid: String,
    /// Raw provider claims, passed through untouched.
    pub claims: Map<String, Value>,
}

impl ValidatedIdentity {
    /// Creates an identity with no claims.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            claims: Map::new(),
        }
    }

    /// Adds a raw claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Returns a claim if it is a string.
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    /// The `email` claim, when the provider supplied one.
    pub fn email(&self) -> Option<&str> {
        self.claim_str("email")
    }
}

/// Trait for identity verifiers.
///
/// Implementations validate an opaque identity assertion issued by an
/// external provider. Failures are terminal; implementations must not retry.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Validates the given assertion.
    ///
    /// # Returns
    ///
    /// * `Ok(ValidatedIdentity)` - If the assertion is well-formed, unexpired
    ///   and signed by a trusted issuer
    /// * `Err(AuthError::InvalidAssertion)` - Otherwise, with provider detail
    async fn verify(&self, assertion: &str) -> Result<ValidatedIdentity, AuthError>;

    /// Returns the name of this verifier for logging/debugging.
    fn name(&self) -> &'static str;
}
