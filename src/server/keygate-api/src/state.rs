//! Shared application state.

use std::sync::Arc;

use keygate_auth::{Exchanger, Gate, IdentityVerifier, PermissionCatalog};

/// Immutable collaborators shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Identity assertion to session token exchange.
    pub exchanger: Exchanger,
    /// Verifier used by the verify endpoint.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Session token gate for protected routes.
    pub gate: Gate,
    /// Permission lookups.
    pub catalog: Arc<dyn PermissionCatalog>,
}
