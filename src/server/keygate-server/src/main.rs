//! Keygate Server - Main entry point.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use keygate_api::AppState;
use keygate_auth::{
    ClaimsDirectory, Exchanger, FirebaseConfig, FirebaseVerifier, Gate, IdentityVerifier,
    StaticCatalog,
};
use keygate_token::SessionCodec;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::parse();

    tracing::info!("Starting Keygate server...");
    tracing::info!(
        project = %config.firebase_project_id,
        lifetime_hours = config.jwt_expiration_hours,
        "Configuration loaded"
    );

    if config.jwt_expiration_hours == 0 {
        tracing::warn!("JWT_EXPIRATION_HOURS is 0 - issued session tokens expire immediately");
    }

    let codec = Arc::new(
        SessionCodec::new(&config.jwt_secret, config.jwt_expiration_hours)
            .context("Invalid session signing configuration")?,
    );
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(
        FirebaseVerifier::new(FirebaseConfig::new(config.firebase_project_id.clone()))
            .context("Failed to initialize Firebase verifier")?,
    );

    let state = AppState {
        exchanger: Exchanger::new(verifier.clone(), Arc::new(ClaimsDirectory), codec.clone()),
        verifier,
        gate: Gate::new(codec),
        catalog: Arc::new(StaticCatalog::default()),
    };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Keygate server listening on {}", addr);

    axum::serve(listener, keygate_api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
