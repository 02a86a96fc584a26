//! Blob storage for uploaded credential files
//!
//! Keys are relative paths like `{holder_id}/{timestamp}-{nonce}.pdf`. The
//! store is content-addressed only indirectly: the credential row holds the
//! digest, the blob store just holds bytes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Storage for uploaded files
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key, overwriting any previous value
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Fetch the bytes for a key, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Filesystem-backed blob store
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key under the root, rejecting anything that could step
    /// outside it
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || Path::new(key).is_absolute()
            || key.split('/').any(|part| part == "..")
        {
            return Err(StorageError::Blob(format!("invalid blob key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Blob(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Blob(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Blob(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Blob(e.to_string())),
        }
    }
}

/// In-memory blob store (testing)
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    data: tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.data
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_blob_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("holder/cert.pdf", b"content").await.unwrap();
        assert_eq!(
            store.get("holder/cert.pdf").await.unwrap(),
            Some(b"content".to_vec())
        );

        assert!(store.delete("holder/cert.pdf").await.unwrap());
        assert_eq!(store.get("holder/cert.pdf").await.unwrap(), None);
        assert!(!store.delete("holder/cert.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_fs_blob_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        assert!(store.put("../outside", b"x").await.is_err());
        assert!(store.put("/etc/passwd", b"x").await.is_err());
        assert!(store.get("a/../../b").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_blob_round_trip() {
        let store = MemoryBlobStore::new();

        store.put("k", b"v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert!(store.delete("k").await.unwrap());
    }
}
