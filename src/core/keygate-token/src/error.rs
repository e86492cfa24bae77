//! Session token error types.

use thiserror::Error;

/// Errors that can occur while issuing or validating session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token is not a well-formed compact JWS or its claims have the wrong shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Signature does not match the header and payload.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Token is correctly signed but past its expiry.
    #[error("token expired")]
    Expired,

    /// Token header asserts an algorithm other than HS256.
    #[error("unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),

    /// Claims could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Secret or lifetime is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}
