//! Cachet API server with graceful shutdown

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use cachet_chain::{EvmRegistry, RegistryBackend};
use cachet_engine::{AnchorWriter, CredentialIntake, RevocationLedger, VerificationResolver};
use cachet_persist::{FsBlobStore, Storage};

use crate::auth::JwtAuth;
use crate::error::ApiError;
use crate::middleware::{
    auth_middleware, body_limit_layer, cors_layer, request_id_middleware, timeout_layer,
};
use crate::routes::api_router;
use crate::state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Database URL (SQLite)
    pub database_url: String,
    /// Root directory for uploaded credential files
    pub blob_root: String,
    /// Whether uploads kick off a background anchoring attempt
    pub auto_anchor: bool,
    /// Request timeout
    pub timeout: Duration,
    /// Max request body size (bytes); bounds the upload size
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".parse().unwrap(),
            database_url: "sqlite:cachet.db?mode=rwc".to_string(),
            blob_root: "./data/blobs".to_string(),
            auto_anchor: true,
            timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10MB, uploads are files
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("CACHET_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("CACHET_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let addr = format!("{host}:{port}")
            .parse()
            .unwrap_or(defaults.addr);

        let timeout_secs: u64 = std::env::var("CACHET_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        let max_body_size: usize = std::env::var("CACHET_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|m| m.parse().ok())
            .unwrap_or(defaults.max_body_size);

        let auto_anchor = std::env::var("CACHET_AUTO_ANCHOR")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            addr,
            database_url: std::env::var("CACHET_DATABASE_URL")
                .unwrap_or(defaults.database_url),
            blob_root: std::env::var("CACHET_BLOB_ROOT").unwrap_or(defaults.blob_root),
            auto_anchor,
            timeout: Duration::from_secs(timeout_secs),
            max_body_size,
        }
    }
}

/// Cachet API server
pub struct CachetServer {
    config: ServerConfig,
    app_state: AppState,
}

impl CachetServer {
    /// Wire up storage, the chain registry, and the engine services
    pub async fn new(config: ServerConfig) -> Result<Self, ApiError> {
        let jwt_auth = JwtAuth::from_env()?;

        let storage = Storage::connect(&config.database_url)
            .await
            .map_err(|e| ApiError::Internal(format!("database init failed: {e}")))?;

        let blobs = Arc::new(FsBlobStore::new(&config.blob_root));

        let registry = EvmRegistry::from_env()
            .map_err(|e| ApiError::Internal(format!("chain registry init failed: {e}")))?;
        if registry.can_write() {
            tracing::info!(
                chain = %registry.chain(),
                network = %registry.network(),
                "anchoring enabled"
            );
        } else {
            tracing::warn!("no signer or registry address configured, anchoring disabled");
        }
        let registry: Arc<dyn RegistryBackend> = Arc::new(registry);

        let anchorer = Arc::new(AnchorWriter::new(storage.clone(), registry.clone()));
        let intake = Arc::new(CredentialIntake::new(
            storage.clone(),
            blobs.clone(),
            anchorer.clone(),
            config.auto_anchor,
        ));
        let resolver = Arc::new(VerificationResolver::new(
            storage.clone(),
            blobs.clone(),
            registry.clone(),
        ));
        let ledger = Arc::new(RevocationLedger::new(storage.clone(), registry));

        let app_state = AppState::new(jwt_auth, storage, intake, resolver, anchorer, ledger);

        Ok(Self { config, app_state })
    }

    /// Build a server around pre-wired state; used by the tests
    pub fn with_state(config: ServerConfig, app_state: AppState) -> Self {
        Self { config, app_state }
    }

    /// The complete router with all middleware layers applied
    pub fn router(&self) -> Router {
        // Order matters: axum executes layers bottom-to-top on the way in
        api_router(self.app_state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(body_limit_layer(self.config.max_body_size))
            .layer(timeout_layer(self.config.timeout))
            .layer(cors_layer())
            .layer(middleware::from_fn(request_id_middleware))
            .layer(middleware::from_fn_with_state(
                self.app_state.clone(),
                auth_middleware,
            ))
    }

    /// Run the server until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), ApiError> {
        let app = self.router();
        let addr = self.config.addr;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("cachet-api listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal(format!("server error: {e}")))?;

        tracing::info!("server shutdown complete");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Initialize tracing subscriber
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cachet_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.auto_anchor);
    }
}
