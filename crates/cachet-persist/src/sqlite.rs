//! SQLite connection handling

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::anchor_store::AnchorStore;
use crate::credential_store::CredentialStore;
use crate::error::StorageError;
use crate::issuer_store::IssuerStore;
use crate::revocation_store::RevocationStore;
use crate::verification_log_store::VerificationLogStore;

/// SQLite configuration options
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database URL (e.g., "sqlite:cachet.db?mode=rwc" or "sqlite::memory:")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Enable WAL journal mode for better concurrency
    pub wal_mode: bool,
    /// Enable foreign key enforcement
    pub foreign_keys: bool,
    /// Busy timeout in seconds
    pub busy_timeout_secs: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:cachet.db?mode=rwc".to_string(),
            max_connections: 5,
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_secs: 30,
        }
    }
}

impl SqliteConfig {
    /// Config for an in-memory database (testing)
    pub fn memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            wal_mode: false,
            foreign_keys: true,
            busy_timeout_secs: 5,
        }
    }
}

/// Connection pool plus typed store handles
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Connect with default config
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let config = SqliteConfig {
            url: url.to_string(),
            ..Default::default()
        };
        Self::connect_with_config(config).await
    }

    /// Connect with full configuration and run migrations
    pub async fn connect_with_config(config: SqliteConfig) -> Result<Self, StorageError> {
        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if config.foreign_keys {
            options = options.pragma("foreign_keys", "ON");
        }
        options = options.pragma("busy_timeout", config.busy_timeout_secs.to_string());

        if config.wal_mode {
            options = options.pragma("journal_mode", "WAL");
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        info!(url = %config.url, wal = config.wal_mode, "Connected to SQLite");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Internal(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// In-memory storage with migrations applied (testing)
    pub async fn memory() -> Result<Self, StorageError> {
        Self::connect_with_config(SqliteConfig::memory()).await
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn is_healthy(&self) -> bool {
        !self.pool.is_closed()
    }

    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.pool.clone())
    }

    pub fn anchors(&self) -> AnchorStore {
        AnchorStore::new(self.pool.clone())
    }

    pub fn issuers(&self) -> IssuerStore {
        IssuerStore::new(self.pool.clone())
    }

    pub fn revocations(&self) -> RevocationStore {
        RevocationStore::new(self.pool.clone())
    }

    pub fn verification_logs(&self) -> VerificationLogStore {
        VerificationLogStore::new(self.pool.clone())
    }
}
