//! HS256 session token codec.
//!
//! Tokens are compact JWS strings (`header.payload.signature`). Decoding
//! is strict about ordering: the header algorithm is checked first, then
//! the signature, and only then are claim values read.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::Map;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{IssuedSession, SessionClaims, SessionGrant, TokenError};

/// The only algorithm accepted by [`SessionCodec::decode`].
pub const SESSION_ALGORITHM: &str = "HS256";

const SECONDS_PER_HOUR: u64 = 3600;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issues and validates session tokens with a shared HMAC secret.
pub struct SessionCodec {
    secret: Zeroizing<Vec<u8>>,
    lifetime_hours: u32,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("secret", &"<redacted>")
            .field("lifetime_hours", &self.lifetime_hours)
            .finish()
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

impl SessionCodec {
    /// Creates a codec.
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC secret, must not be empty
    /// * `lifetime_hours` - Validity window of issued tokens
    pub fn new(secret: impl AsRef<[u8]>, lifetime_hours: u32) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::Configuration(
                "signing secret must not be empty".into(),
            ));
        }

        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            lifetime_hours,
        })
    }

    /// Configured token lifetime in hours.
    pub fn lifetime_hours(&self) -> u32 {
        self.lifetime_hours
    }

    /// Configured token lifetime in seconds.
    pub fn lifetime_secs(&self) -> u64 {
        u64::from(self.lifetime_hours) * SECONDS_PER_HOUR
    }

    /// Signs `grant` into a new session token issued now.
    pub fn encode(&self, grant: &SessionGrant) -> Result<IssuedSession, TokenError> {
        self.encode_at(grant, unix_now())
    }

    /// Signs `grant` into a session token issued at `now`.
    pub fn encode_at(&self, grant: &SessionGrant, now: u64) -> Result<IssuedSession, TokenError> {
        let expires_in = self.lifetime_secs();
        let exp = now.checked_add(expires_in).ok_or_else(|| {
            TokenError::Configuration(format!(
                "lifetime of {} hours overflows the expiry timestamp",
                self.lifetime_hours
            ))
        })?;

        let claims = SessionClaims {
            subject: grant.subject.clone(),
            email: grant.email.clone(),
            org_id: Some(grant.organization_id.clone()),
            permissions: grant.permissions.clone(),
            iat: now,
            exp,
            extra: Map::new(),
        };

        let key = EncodingKey::from_secret(&self.secret);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!(sub = %claims.subject, org_id = %grant.organization_id, exp, "Issued session token");

        Ok(IssuedSession {
            token,
            claims,
            expires_in,
        })
    }

    /// Validates `token` against the current time.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.decode_at(token, unix_now())
    }

    /// Validates `token` as if the current time were `now`.
    pub fn decode_at(&self, token: &str, now: u64) -> Result<SessionClaims, TokenError> {
        check_algorithm(token)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(&self.secret);
        let claims = jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                ErrorKind::InvalidAlgorithm => {
                    TokenError::UnexpectedAlgorithm("algorithm not permitted".into())
                },
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::MalformedToken(e.to_string()),
            })?
            .claims;

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Rejects any token whose header does not assert HS256.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let header = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(_), Some(_), None) => header,
        _ => {
            return Err(TokenError::MalformedToken(
                "expected three dot-separated segments".into(),
            ))
        },
    };

    let raw = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::MalformedToken(format!("header is not base64url: {e}")))?;
    let header: RawHeader = serde_json::from_slice(&raw)
        .map_err(|e| TokenError::MalformedToken(format!("header is not valid JSON: {e}")))?;

    if header.alg != SESSION_ALGORITHM {
        return Err(TokenError::UnexpectedAlgorithm(header.alg));
    }

    Ok(())
}
