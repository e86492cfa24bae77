//! Firebase ID token verifier.
//!
//! Validates RS256 ID tokens issued by Firebase Authentication against
//! Google's published `securetoken` signing keys.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use keygate_token::unix_now;
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{AuthError, IdentityVerifier, ValidatedIdentity};

/// Google's JWKS endpoint for Firebase ID token signing keys.
pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const MAX_SUBJECT_LEN: usize = 128;
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the Firebase verifier.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Firebase project id (expected audience).
    pub project_id: String,
    /// JWKS endpoint serving the signing keys.
    pub jwks_url: String,
    /// Accepted clock skew in seconds.
    pub leeway_secs: u64,
}

impl FirebaseConfig {
    /// Creates a configuration for `project_id` with Google's key endpoint.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            leeway_secs: 60,
        }
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("{ISSUER_PREFIX}{}", self.project_id)
    }
}

/// JWKS document.
#[derive(Debug, Deserialize)]
pub struct Jwks {
    /// Published keys.
    pub keys: Vec<Jwk>,
}

/// A single RSA JSON Web Key.
#[derive(Debug, Deserialize)]
pub struct Jwk {
    /// Key type.
    pub kty: String,
    /// Key id.
    pub kid: Option<String>,
    /// Key use (sig, enc).
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url).
    pub n: Option<String>,
    /// RSA exponent (base64url).
    pub e: Option<String>,
}

impl Jwk {
    fn decoding_key(&self) -> Result<DecodingKey, String> {
        if self.kty != "RSA" {
            return Err(format!("unsupported key type: {}", self.kty));
        }
        let n = self.n.as_deref().ok_or("RSA key missing 'n'")?;
        let e = self.e.as_deref().ok_or("RSA key missing 'e'")?;
        DecodingKey::from_rsa_components(n, e).map_err(|e| e.to_string())
    }
}

struct KeySet {
    keys: HashMap<String, DecodingKey>,
    /// `None` for pinned key sets that never refresh.
    expires_at: Option<Instant>,
}

impl KeySet {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Cache of Google's signing keys, keyed by `kid`.
///
/// Keys are refreshed when the `Cache-Control: max-age` window of the last
/// response has elapsed, or when a token names an unknown `kid`. Such
/// refreshes run one at a time and at most once per 30 seconds.
pub struct GoogleKeyCache {
    keys: RwLock<KeySet>,
    last_refresh: Mutex<Option<Instant>>,
    jwks_url: Option<String>,
    http_client: reqwest::Client,
}

impl GoogleKeyCache {
    /// Creates an empty cache backed by `jwks_url`. Keys are fetched lazily.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            keys: RwLock::new(KeySet {
                keys: HashMap::new(),
                expires_at: Some(Instant::now()),
            }),
            last_refresh: Mutex::new(None),
            jwks_url: Some(jwks_url.into()),
            http_client,
        })
    }

    /// Creates a cache pinned to the given keys. It never fetches.
    pub fn with_keys(keys: HashMap<String, DecodingKey>) -> Self {
        Self {
            keys: RwLock::new(KeySet {
                keys,
                expires_at: None,
            }),
            last_refresh: Mutex::new(None),
            jwks_url: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Returns the decoding key for `kid`, refreshing the set if needed.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let set = self.keys.read().await;
            if set.is_fresh() {
                if let Some(key) = set.keys.get(kid) {
                    return Ok(key.clone());
                }
                if set.expires_at.is_none() {
                    return Err(unknown_kid(kid));
                }
            }
        }

        debug!(kid = %kid, "Signing key not cached, refreshing");
        self.refresh_throttled().await?;

        let set = self.keys.read().await;
        set.keys.get(kid).cloned().ok_or_else(|| unknown_kid(kid))
    }

    async fn refresh_throttled(&self) -> Result<(), AuthError> {
        let mut last = self.last_refresh.lock().await;
        if last.is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL) {
            debug!("Signing key refresh throttled");
            return Ok(());
        }
        *last = Some(Instant::now());
        self.refresh().await
    }

    /// Fetches the key set from the JWKS endpoint.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let Some(url) = self.jwks_url.as_deref() else {
            return Ok(());
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(fetch_failed(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(DEFAULT_KEY_TTL);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| fetch_failed(format!("invalid JWKS document: {e}")))?;

        let keys = parse_jwks(jwks);
        if keys.is_empty() {
            return Err(fetch_failed("no usable signing keys".into()));
        }

        let key_count = keys.len();
        *self.keys.write().await = KeySet {
            keys,
            expires_at: Some(Instant::now() + ttl),
        };

        info!(url = %url, key_count, ttl_secs = ttl.as_secs(), "Signing keys refreshed");
        Ok(())
    }
}

fn unknown_kid(kid: &str) -> AuthError {
    AuthError::InvalidAssertion(format!("no signing key found for kid '{kid}'"))
}

fn fetch_failed(detail: String) -> AuthError {
    AuthError::InvalidAssertion(format!("failed to fetch signing keys: {detail}"))
}

/// Converts a JWKS document into decoding keys, skipping unusable entries.
fn parse_jwks(jwks: Jwks) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in jwks.keys {
        if jwk.key_use.as_deref() == Some("enc") {
            continue;
        }
        let Some(kid) = jwk.kid.clone() else {
            continue;
        };
        match jwk.decoding_key() {
            Ok(key) => {
                keys.insert(kid, key);
            },
            Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable JWK"),
        }
    }
    keys
}

/// Parses `max-age` out of a `Cache-Control` header.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age=")?.parse().ok())
        .map(Duration::from_secs)
}

/// Identity verifier for Firebase ID tokens.
pub struct FirebaseVerifier {
    project_id: String,
    issuer: String,
    leeway_secs: u64,
    keys: GoogleKeyCache,
}

impl FirebaseVerifier {
    /// Creates a verifier that fetches keys from `config.jwks_url`.
    pub fn new(config: FirebaseConfig) -> Result<Self, AuthError> {
        if config.project_id.is_empty() {
            return Err(AuthError::Configuration(
                "Firebase project id must not be empty".into(),
            ));
        }
        let keys = GoogleKeyCache::new(config.jwks_url.clone())?;
        Ok(Self::with_key_cache(config, keys))
    }

    /// Creates a verifier over an existing key cache.
    pub fn with_key_cache(config: FirebaseConfig, keys: GoogleKeyCache) -> Self {
        Self {
            issuer: config.issuer(),
            project_id: config.project_id,
            leeway_secs: config.leeway_secs,
            keys,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.project_id]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);
        validation.leeway = self.leeway_secs;
        validation
    }

    fn check_claims(&self, claims: &Map<String, Value>, now: u64) -> Result<String, AuthError> {
        let sub = claims
            .get("sub")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("ID token has no string \"sub\" claim"))?;
        if sub.is_empty() {
            return Err(invalid("ID token has an empty \"sub\" claim"));
        }
        if sub.chars().count() > MAX_SUBJECT_LEN {
            return Err(invalid("ID token has a \"sub\" claim longer than 128 characters"));
        }

        if !claims.contains_key("iat") {
            return Err(invalid("ID token is missing \"iat\""));
        }

        let latest = now + self.leeway_secs;
        for name in ["iat", "auth_time"] {
            if let Some(value) = claims.get(name) {
                let issued = value
                    .as_u64()
                    .ok_or_else(|| invalid(&format!("ID token \"{name}\" is not a timestamp")))?;
                if issued > latest {
                    return Err(invalid(&format!("ID token \"{name}\" is in the future")));
                }
            }
        }

        Ok(sub.to_string())
    }
}

fn invalid(detail: &str) -> AuthError {
    AuthError::InvalidAssertion(detail.to_string())
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, assertion: &str) -> Result<ValidatedIdentity, AuthError> {
        let header = decode_header(assertion)
            .map_err(|e| AuthError::InvalidAssertion(format!("malformed ID token: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidAssertion(format!(
                "ID token has incorrect algorithm {:?}, expected RS256",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| invalid("ID token has no \"kid\" header"))?;

        let key = self.keys.get_key(&kid).await?;

        let token_data = decode::<Map<String, Value>>(assertion, &key, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => invalid("ID token has expired"),
                ErrorKind::InvalidIssuer => invalid("ID token has incorrect issuer"),
                ErrorKind::InvalidAudience => invalid("ID token has incorrect audience"),
                ErrorKind::InvalidSignature => invalid("ID token has invalid signature"),
                ErrorKind::MissingRequiredClaim(claim) => {
                    AuthError::InvalidAssertion(format!("ID token is missing \"{claim}\""))
                },
                _ => AuthError::InvalidAssertion(format!("ID token rejected: {e}")),
            })?;

        let claims = token_data.claims;
        let uid = self.check_claims(&claims, unix_now())?;

        debug!(uid = %uid, "Firebase ID token verified");

        Ok(ValidatedIdentity { uid, claims })
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}
