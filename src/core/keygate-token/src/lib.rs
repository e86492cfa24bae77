//! # Keygate Token
//!
//! Session token codec for Keygate.
//!
//! Session tokens are HS256-signed compact JWS strings carrying a fixed
//! claim set:
//! - `uid` - subject of the external account
//! - `email` - optional email address
//! - `org_id` - organization scope, always present (may be empty)
//! - `permissions` - granted capability names
//! - `iat` / `exp` - issue and expiry timestamps
//!
//! Decoding accepts HS256 only and is all-or-nothing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod codec;
pub mod error;

pub use claims::{IssuedSession, SessionClaims, SessionGrant};
pub use codec::{unix_now, SessionCodec, SESSION_ALGORITHM};
pub use error::TokenError;
