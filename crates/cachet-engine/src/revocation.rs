//! Revocation ledger
//!
//! Revocation is local-first: the credential's status flips before anything
//! touches the chain, so the resolver's revocation check can never be
//! bypassed by chain lag. The on-chain revoke is a detached best-effort
//! follow-up.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use cachet_chain::RegistryBackend;
use cachet_core::{identifier_digest, ActorRole, Credential, RevocationEvent};
use cachet_persist::Storage;

use crate::error::EngineError;

/// Appends revocation events and keeps the credential's status in sync
pub struct RevocationLedger {
    storage: Storage,
    registry: Arc<dyn RegistryBackend>,
}

impl RevocationLedger {
    pub fn new(storage: Storage, registry: Arc<dyn RegistryBackend>) -> Self {
        Self { storage, registry }
    }

    /// Revoke a credential.
    ///
    /// Idempotent: revoking an already-revoked credential appends a fresh
    /// ledger entry but leaves the original revocation metadata in place.
    pub async fn revoke(
        &self,
        credential_id: Uuid,
        actor: Uuid,
        actor_role: ActorRole,
        reason: Option<String>,
    ) -> Result<(Credential, RevocationEvent), EngineError> {
        let existed = self
            .storage
            .credentials()
            .mark_revoked(credential_id, actor, reason.as_deref())
            .await?;
        if !existed {
            return Err(EngineError::NotFound(format!("credential {credential_id}")));
        }

        let event = RevocationEvent {
            id: Uuid::new_v4(),
            credential_id,
            actor,
            actor_role,
            reason,
            created_at: Utc::now(),
        };
        self.storage.revocations().append(&event).await?;

        tracing::info!(
            credential_id = %credential_id,
            actor = %actor,
            role = %actor_role,
            "credential revoked"
        );

        self.spawn_chain_revoke(credential_id).await;

        let credential = self
            .storage
            .credentials()
            .find_by_id(credential_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("credential {credential_id}")))?;

        Ok((credential, event))
    }

    /// Full ledger history for one credential, oldest first
    pub async fn history(
        &self,
        credential_id: Uuid,
    ) -> Result<Vec<RevocationEvent>, EngineError> {
        Ok(self.storage.revocations().list(credential_id).await?)
    }

    /// Propagate the revocation to any confirmed anchor. Detached and
    /// best-effort: the local status already wins, a chain failure here only
    /// delays the corroborating signal.
    async fn spawn_chain_revoke(&self, credential_id: Uuid) {
        if !self.registry.can_write() {
            return;
        }

        let anchor = match self
            .storage
            .anchors()
            .find_active(credential_id, self.registry.chain(), self.registry.network())
            .await
        {
            Ok(Some(anchor)) if anchor.is_confirmed() => anchor,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(credential_id = %credential_id, error = %e, "anchor lookup failed before chain revoke");
                return;
            }
        };

        let registry = self.registry.clone();
        let id_word = identifier_digest(credential_id).to_word();
        tokio::spawn(async move {
            match registry.revoke(&anchor.registry_address, id_word).await {
                Ok(tx_hash) => {
                    tracing::info!(credential_id = %credential_id, tx_hash = %tx_hash, "on-chain revocation submitted");
                }
                Err(e) => {
                    tracing::warn!(credential_id = %credential_id, error = %e, "on-chain revocation failed");
                }
            }
        });
    }
}
