//! # Keygate Auth
//!
//! Authentication and session exchange for Keygate.
//!
//! ## Components
//!
//! - Identity verification (Firebase ID tokens)
//! - User directory lookup
//! - Session exchange (identity assertion to session token)
//! - Access gate (bearer session token to [`AuthContext`])
//! - Permission catalog

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod directory;
pub mod error;
pub mod exchange;
pub mod firebase;
pub mod gate;
pub mod identity;
pub mod permissions;

pub use context::AuthContext;
pub use directory::{ClaimsDirectory, UserDirectory, UserRecord};
pub use error::AuthError;
pub use exchange::{Exchanged, Exchanger, ScopeRequest};
pub use firebase::{FirebaseConfig, FirebaseVerifier, GoogleKeyCache};
pub use gate::{Gate, GateRejection};
pub use identity::{IdentityVerifier, ValidatedIdentity};
pub use permissions::{PermissionCatalog, StaticCatalog};
