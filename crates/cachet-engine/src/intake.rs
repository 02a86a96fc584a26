//! Upload intake
//!
//! Accepts an uploaded file plus its claim metadata, computes the canonical
//! digest, writes the blob, and inserts the credential row. Anchoring
//! happens in the background; the upload response never waits on the chain.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use cachet_core::{
    content_digest, CanonicalClaim, Credential, CredentialStatus, QrToken, TrustLevel, Visibility,
};
use cachet_persist::{BlobStore, Storage};

use crate::anchor::{spawn_anchor, AnchorWriter};
use crate::error::EngineError;

/// Background anchoring retry bound
const ANCHOR_MAX_ATTEMPTS: u32 = 5;

/// Everything the caller supplies for a new credential
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub holder_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub credential_type: Option<String>,
    pub category: Option<String>,
    pub issuer_id: Option<Uuid>,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    /// Defaults to link-only: resolvable by whoever holds the qr token
    pub visibility: Option<Visibility>,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Handles credential creation and trust-level transitions
pub struct CredentialIntake {
    storage: Storage,
    blobs: Arc<dyn BlobStore>,
    anchorer: Arc<AnchorWriter>,
    auto_anchor: bool,
}

impl CredentialIntake {
    pub fn new(
        storage: Storage,
        blobs: Arc<dyn BlobStore>,
        anchorer: Arc<AnchorWriter>,
        auto_anchor: bool,
    ) -> Self {
        Self {
            storage,
            blobs,
            anchorer,
            auto_anchor,
        }
    }

    /// Create a credential from an upload. Returns the stored row; its
    /// `qr_token` is the public verification key the holder shares.
    pub async fn upload(&self, new: NewCredential) -> Result<Credential, EngineError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidInput("title is required".to_string()));
        }
        if new.bytes.is_empty() {
            return Err(EngineError::InvalidInput(
                "uploaded file is empty".to_string(),
            ));
        }

        let claim = CanonicalClaim {
            title,
            issuer_id: new.issuer_id,
            issued_date: new.issued_date,
        };
        let digest = content_digest(&new.bytes, &claim);

        let id = Uuid::new_v4();
        let storage_path = blob_key(new.holder_id, &new.file_name);
        self.blobs.put(&storage_path, &new.bytes).await?;

        let credential = Credential {
            id,
            holder_id: new.holder_id,
            issuer_id: new.issuer_id,
            title: title.to_string(),
            description: new.description,
            credential_type: new.credential_type,
            category: new.category,
            issued_date: new.issued_date,
            expiry_date: new.expiry_date,
            status: CredentialStatus::Active,
            trust_level: TrustLevel::SelfAsserted,
            visibility: new.visibility.unwrap_or(Visibility::LinkOnly),
            qr_token: QrToken::generate(),
            content_hash: digest,
            storage_path,
            verification_count: 0,
            last_verified_at: None,
            revoked_at: None,
            revoked_by: None,
            revoked_reason: None,
            created_at: Utc::now(),
        };

        self.storage.credentials().insert(&credential).await?;

        tracing::info!(
            credential_id = %credential.id,
            holder_id = %credential.holder_id,
            digest = %credential.content_hash,
            "credential created"
        );

        if self.auto_anchor {
            spawn_anchor(self.anchorer.clone(), credential.id, ANCHOR_MAX_ATTEMPTS);
        }

        Ok(credential)
    }

    /// Move a credential's trust level. Downgrades require explicit
    /// reviewer authorization; upgrades always go through.
    pub async fn set_trust_level(
        &self,
        credential_id: Uuid,
        level: TrustLevel,
        downgrade_authorized: bool,
    ) -> Result<Credential, EngineError> {
        let credential = self
            .storage
            .credentials()
            .find_by_id(credential_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("credential {credential_id}")))?;

        if level.rank() < credential.trust_level.rank() && !downgrade_authorized {
            return Err(EngineError::Forbidden(format!(
                "trust level downgrade from {} to {} requires reviewer authorization",
                credential.trust_level, level
            )));
        }

        self.storage
            .credentials()
            .set_trust_level(credential_id, level)
            .await?;

        Ok(Credential {
            trust_level: level,
            ..credential
        })
    }
}

/// Blob key: `{holder_id}/{timestamp}-{nonce}.{ext}`. The nonce keeps two
/// same-second uploads from colliding; the extension survives only if it
/// looks like one.
fn blob_key(holder_id: Uuid, file_name: &str) -> String {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_ascii_lowercase();
    let nonce = hex::encode(rand::random::<[u8; 4]>());
    format!(
        "{}/{}-{}.{}",
        holder_id,
        Utc::now().timestamp_millis(),
        nonce,
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key_shape() {
        let holder = Uuid::new_v4();
        let key = blob_key(holder, "diploma.PDF");
        assert!(key.starts_with(&format!("{holder}/")));
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn test_blob_key_defaults_extension() {
        let holder = Uuid::new_v4();
        assert!(blob_key(holder, "no-extension").ends_with(".bin"));
        assert!(blob_key(holder, "weird.<>?").ends_with(".bin"));
        assert!(blob_key(holder, "too.longextension1").ends_with(".bin"));
    }

    #[test]
    fn test_blob_keys_do_not_collide() {
        let holder = Uuid::new_v4();
        assert_ne!(blob_key(holder, "a.pdf"), blob_key(holder, "a.pdf"));
    }
}
