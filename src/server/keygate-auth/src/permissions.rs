//! Permission catalog.

use async_trait::async_trait;

use crate::{AuthContext, AuthError};

/// Placeholder permissions returned by [`StaticCatalog::default`].
pub const DEFAULT_PERMISSIONS: &[&str] = &[
    "read:agents",
    "create:agents",
    "update:agents",
    "delete:agents",
    "read:files",
    "upload:files",
    "delete:files",
];

/// Trait for permission lookups.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Returns the permissions the authenticated principal holds.
    async fn permissions_for(&self, ctx: &AuthContext) -> Result<Vec<String>, AuthError>;
}

/// Catalog returning the same list for every principal.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    permissions: Vec<String>,
}

impl StaticCatalog {
    /// Creates a catalog serving `permissions`.
    pub fn new(permissions: Vec<String>) -> Self {
        Self { permissions }
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_PERMISSIONS.iter().map(|p| p.to_string()).collect())
    }
}

#[async_trait]
impl PermissionCatalog for StaticCatalog {
    async fn permissions_for(&self, _ctx: &AuthContext) -> Result<Vec<String>, AuthError> {
        Ok(self.permissions.clone())
    }
}
