//! Cachet server - standalone entry point for the Cachet API
//!
//! A thin wrapper around `cachet-api` that provides a runnable binary for
//! production deployments without modifying the library crate.

use anyhow::Result;
use cachet_api::{CachetServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    cachet_api::init_tracing();

    tracing::info!("starting cachet server");

    // PaaS compatibility: map the platform's $PORT to CACHET_PORT
    if let Ok(port) = std::env::var("PORT") {
        if std::env::var("CACHET_PORT").is_err() {
            tracing::info!("mapping PORT {} to CACHET_PORT", port);
            std::env::set_var("CACHET_PORT", port);
        }
    }

    let config = ServerConfig::from_env();

    let server = CachetServer::new(config).await.map_err(|e| {
        tracing::error!("failed to initialize server: {}", e);
        e
    })?;

    server.run().await.map_err(|e| {
        tracing::error!("server error during execution: {}", e);
        e
    })?;

    Ok(())
}
