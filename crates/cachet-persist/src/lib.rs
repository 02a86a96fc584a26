//! # Cachet Persistence
//!
//! SQLite-backed stores for credentials, anchors, and audit trails, plus
//! blob storage for the uploaded files themselves.
//!
//! Credential and revocation rows are never deleted; anchors are deleted in
//! exactly one case (a pending placeholder whose submission never reached
//! any endpoint).

pub mod anchor_store;
pub mod blob;
pub mod credential_store;
pub mod error;
pub mod issuer_store;
pub mod revocation_store;
pub mod sqlite;
pub mod verification_log_store;

pub use anchor_store::AnchorStore;
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use credential_store::CredentialStore;
pub use error::StorageError;
pub use issuer_store::IssuerStore;
pub use revocation_store::RevocationStore;
pub use sqlite::{SqliteConfig, Storage};
pub use verification_log_store::VerificationLogStore;
