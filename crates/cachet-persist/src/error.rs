//! Storage error types

/// Errors surfaced by the stores and the blob layer
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Blob error: {0}")]
    Blob(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Map a sqlx error on insert, distinguishing unique-index conflicts.
/// Conflicts are how concurrent anchor writers lose the race, so they must
/// stay distinguishable from plain query failures.
pub(crate) fn insert_error(e: sqlx::Error, what: &str) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::AlreadyExists(what.to_string())
        }
        _ => StorageError::Query(e.to_string()),
    }
}
