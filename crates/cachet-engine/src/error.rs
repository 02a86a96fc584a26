//! Engine error types

use cachet_chain::ChainError;
use cachet_persist::StorageError;

/// Errors surfaced by the lifecycle engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
