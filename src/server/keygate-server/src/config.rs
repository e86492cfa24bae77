//! Server configuration.
//!
//! Every option can be given as a flag or through the environment.
//! Required values that are missing or malformed abort startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;

/// Keygate server configuration.
#[derive(Parser, Clone)]
#[command(name = "keygate-server")]
#[command(about = "Keygate - Firebase identity to session token exchange gateway")]
#[command(version)]
pub struct Config {
    /// Listening port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Listening address
    #[arg(long, env = "KEYGATE_BIND_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_host: IpAddr,

    /// Firebase project id (audience of accepted ID tokens)
    #[arg(long, env = "FIREBASE_PROJECT_ID", value_parser = NonEmptyStringValueParser::new())]
    pub firebase_project_id: String,

    /// HMAC secret used to sign session tokens
    #[arg(
        long,
        env = "JWT_SECRET",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub jwt_secret: String,

    /// Session token lifetime in hours
    #[arg(long, env = "JWT_EXPIRATION_HOURS", default_value_t = 24)]
    pub jwt_expiration_hours: u32,
}

impl Config {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_host", &self.bind_host)
            .field("firebase_project_id", &self.firebase_project_id)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .finish()
    }
}
