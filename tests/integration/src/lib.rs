//! Integration tests for the Keygate server.
//!
//! These tests drive the full HTTP stack over a real socket: exchange an
//! identity assertion for a session token, then use it on a gated route.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use keygate_api::AppState;
use keygate_auth::{
    AuthError, ClaimsDirectory, Exchanger, Gate, IdentityVerifier, StaticCatalog,
    ValidatedIdentity,
};
use keygate_token::SessionCodec;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResponse {
    pub uid: String,
    pub email: Value,
    pub claims: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct GenerateJwtRequest {
    pub firebase_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsResponse {
    pub user_id: String,
    pub organization_id: String,
    pub roles: Option<Value>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Identity provider stand-in
// ============================================================================

/// Verifier accepting a fixed table of assertions.
#[derive(Default)]
pub struct StubVerifier {
    identities: HashMap<String, ValidatedIdentity>,
}

impl StubVerifier {
    pub fn with(mut self, assertion: &str, identity: ValidatedIdentity) -> Self {
        self.identities.insert(assertion.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, assertion: &str) -> Result<ValidatedIdentity, AuthError> {
        self.identities
            .get(assertion)
            .cloned()
            .ok_or_else(|| AuthError::InvalidAssertion("ID token has invalid signature".into()))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

// ============================================================================
// Test Server
// ============================================================================

/// A Keygate router served on an ephemeral local port.
pub struct TestServer {
    pub base_url: String,
    pub codec: Arc<SessionCodec>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with the given verifier, secret and token lifetime.
    pub async fn start(
        verifier: StubVerifier,
        secret: &str,
        lifetime_hours: u32,
    ) -> Result<Self> {
        let codec = Arc::new(SessionCodec::new(secret, lifetime_hours)?);
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(verifier);

        let state = AppState {
            exchanger: Exchanger::new(verifier.clone(), Arc::new(ClaimsDirectory), codec.clone()),
            verifier,
            gate: Gate::new(codec.clone()),
            catalog: Arc::new(StaticCatalog::default()),
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, keygate_api::router(state)).await;
        });

        let server = Self {
            base_url: format!("http://{}", addr),
            codec,
            handle,
        };
        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to answer its health probe.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = self.client();
        for _ in 0..50 {
            if client.health().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        bail!("Server failed to start within 5 seconds")
    }

    /// Get a configured HTTP client for this server.
    pub fn client(&self) -> KeygateClient {
        KeygateClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the Keygate API.
pub struct KeygateClient {
    client: Client,
    base_url: String,
}

impl KeygateClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<Value> {
        let resp = self.client.get(self.url("/health")).send().await?;
        if !resp.status().is_success() {
            bail!("Health check failed: {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn verify(&self, token: &str) -> Result<VerifyResponse> {
        let req = VerifyRequest {
            token: token.to_string(),
        };
        let resp = self
            .client
            .post(self.url("/api/v1/auth/verify"))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("Verify failed: {}", resp.text().await?);
        }
        Ok(resp.json().await?)
    }

    /// Raw exchange call, returning the status and body.
    pub async fn generate_jwt_raw(&self, req: &GenerateJwtRequest) -> Result<(StatusCode, Value)> {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/generate-jwt"))
            .json(req)
            .send()
            .await?;
        let status = resp.status();
        Ok((status, resp.json().await?))
    }

    pub async fn generate_jwt(
        &self,
        firebase_token: &str,
        organization_id: Option<&str>,
        permissions: Option<Vec<String>>,
    ) -> Result<TokenResponse> {
        let req = GenerateJwtRequest {
            firebase_token: firebase_token.to_string(),
            organization_id: organization_id.map(String::from),
            permissions,
        };
        let (status, body) = self.generate_jwt_raw(&req).await?;
        if !status.is_success() {
            bail!("Generate JWT failed ({}): {}", status, body);
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Calls the gated permissions route with a raw `Authorization` value.
    pub async fn permissions_raw(&self, authorization: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.get(self.url("/api/v1/permissions"));
        if let Some(value) = authorization {
            req = req.header(reqwest::header::AUTHORIZATION, value);
        }
        let resp = req.send().await?;
        let status = resp.status();
        Ok((status, resp.json().await?))
    }

    pub async fn permissions(&self, session_token: &str) -> Result<PermissionsResponse> {
        let (status, body) = self
            .permissions_raw(Some(format!("Bearer {}", session_token).as_str()))
            .await?;
        if !status.is_success() {
            bail!("Permissions failed ({}): {}", status, body);
        }
        Ok(serde_json::from_value(body)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "integration-secret";

    fn stub() -> StubVerifier {
        StubVerifier::default().with(
            "assertion-u1",
            ValidatedIdentity::new("u1")
                .with_claim("email", "a@b.com")
                .with_claim("email_verified", true)
                .with_claim("name", "Ada Lovelace"),
        )
    }

    fn error_of(body: &Value) -> String {
        serde_json::from_value::<ErrorResponse>(body.clone())
            .unwrap()
            .error
    }

    #[tokio::test]
    async fn test_server_health() {
        let server = TestServer::start(stub(), SECRET, 24).await.unwrap();
        let health = server.client().health().await.unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn test_exchange_then_access() {
        let server = TestServer::start(stub(), SECRET, 24).await.unwrap();
        let client = server.client();

        let issued = client
            .generate_jwt(
                "assertion-u1",
                Some("org1"),
                Some(vec!["read:agents".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(issued.expires_in, 24 * 3600);

        let claims = server.codec.decode(&issued.token).unwrap();
        assert_eq!(claims.subject, "u1");
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(claims.org_id.as_deref(), Some("org1"));
        assert_eq!(claims.permissions, vec!["read:agents"]);
        assert_eq!(claims.exp, claims.iat + 24 * 3600);

        let permissions = client.permissions(&issued.token).await.unwrap();
        assert_eq!(permissions.user_id, "u1");
        assert_eq!(permissions.organization_id, "org1");
        assert_eq!(permissions.roles, None);
        assert!(permissions.permissions.contains(&"upload:files".to_string()));
    }

    #[tokio::test]
    async fn test_unscoped_session_is_gated() {
        let server = TestServer::start(stub(), SECRET, 24).await.unwrap();
        let client = server.client();

        let issued = client.generate_jwt("assertion-u1", None, None).await.unwrap();
        let claims = server.codec.decode(&issued.token).unwrap();
        assert_eq!(claims.org_id, Some(String::new()));

        let (status, body) = client
            .permissions_raw(Some(format!("Bearer {}", issued.token).as_str()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&body), "Token missing organization ID");
    }

    #[tokio::test]
    async fn test_gate_states() {
        let server = TestServer::start(stub(), SECRET, 24).await.unwrap();
        let client = server.client();

        let (status, body) = client.permissions_raw(None).await.unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&body), "Authorization header is required");

        let (status, body) = client.permissions_raw(Some("Token abc")).await.unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_of(&body),
            "Authorization header must be in the format 'Bearer {token}'"
        );

        let (status, body) = client.permissions_raw(Some("Bearer abc")).await.unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(error_of(&body).starts_with("Invalid token: malformed token"));
    }

    #[tokio::test]
    async fn test_token_from_another_deployment_rejected() {
        let issuer = TestServer::start(stub(), "deployment-a", 24).await.unwrap();
        let verifier = TestServer::start(stub(), "deployment-b", 24).await.unwrap();

        let issued = issuer
            .client()
            .generate_jwt("assertion-u1", Some("org1"), None)
            .await
            .unwrap();

        let (status, body) = verifier
            .client()
            .permissions_raw(Some(format!("Bearer {}", issued.token).as_str()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&body), "Invalid token: signature mismatch");
    }

    #[tokio::test]
    async fn test_zero_lifetime_tokens_are_expired() {
        let server = TestServer::start(stub(), SECRET, 0).await.unwrap();
        let client = server.client();

        let issued = client
            .generate_jwt("assertion-u1", Some("org1"), None)
            .await
            .unwrap();
        assert_eq!(issued.expires_in, 0);

        let (status, body) = client
            .permissions_raw(Some(format!("Bearer {}", issued.token).as_str()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&body), "Invalid token: token expired");
    }

    #[tokio::test]
    async fn test_verify_endpoint() {
        let server = TestServer::start(stub(), SECRET, 24).await.unwrap();
        let client = server.client();

        let verified = client.verify("assertion-u1").await.unwrap();
        assert_eq!(verified.uid, "u1");
        assert_eq!(verified.email, "a@b.com");
        assert_eq!(verified.claims["name"], "Ada Lovelace");

        assert!(client.verify("forged").await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_assertion_is_unauthorized() {
        let server = TestServer::start(stub(), SECRET, 24).await.unwrap();

        let req = GenerateJwtRequest {
            firebase_token: "forged".to_string(),
            organization_id: Some("org1".to_string()),
            permissions: None,
        };
        let (status, body) = server.client().generate_jwt_raw(&req).await.unwrap();

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(error_of(&body).contains("invalid signature"));
    }
}
