//! Anchor writer
//!
//! Submits a credential's canonical digest to the on-chain registry, exactly
//! once per (credential, chain, network). The pending bookkeeping row is
//! inserted before submission so a crash while waiting for confirmation can
//! never lose the transaction hash, and the partial unique index at the
//! storage layer turns a concurrent double-anchor into a clean race loss.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use cachet_chain::{explorer_tx_url, ChainError, RegistryBackend};
use cachet_core::{identifier_digest, AnchorStatus, BlockchainAnchor, Credential};
use cachet_persist::{Storage, StorageError};

use crate::backoff::BackoffStrategy;
use crate::error::EngineError;

/// Default number of receipt polls after submission
pub const DEFAULT_RECEIPT_ATTEMPTS: u32 = 10;

/// Default pause between receipt polls
pub const DEFAULT_RECEIPT_INTERVAL: Duration = Duration::from_secs(3);

/// What one anchor invocation did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnchorOutcome {
    /// A non-failed anchor already exists; nothing was submitted
    AlreadyAnchored { anchor: BlockchainAnchor },
    /// A transaction was submitted this call; the anchor carries its
    /// observed state (confirmed, still pending, or failed on revert)
    Submitted { anchor: BlockchainAnchor },
    /// No endpoint was reachable; retryable later, nothing persisted
    Deferred { reason: String },
    /// Writes are not configured (no registry address or signer)
    Skipped { reason: String },
}

impl AnchorOutcome {
    /// Whether a later retry could change anything
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

/// Writes credential digests to the on-chain registry
pub struct AnchorWriter {
    storage: Storage,
    registry: Arc<dyn RegistryBackend>,
    receipt_attempts: u32,
    receipt_interval: Duration,
}

impl AnchorWriter {
    pub fn new(storage: Storage, registry: Arc<dyn RegistryBackend>) -> Self {
        Self {
            storage,
            registry,
            receipt_attempts: DEFAULT_RECEIPT_ATTEMPTS,
            receipt_interval: DEFAULT_RECEIPT_INTERVAL,
        }
    }

    /// Tune receipt polling (tests use a single fast poll)
    pub fn with_receipt_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.receipt_attempts = attempts;
        self.receipt_interval = interval;
        self
    }

    pub fn registry(&self) -> &Arc<dyn RegistryBackend> {
        &self.registry
    }

    /// Anchor one credential on the configured (chain, network).
    ///
    /// Idempotent: a live (pending or confirmed) row short-circuits without
    /// touching the chain. A pending row left behind by an earlier crash or
    /// an exhausted poll resumes confirmation polling instead of
    /// resubmitting.
    pub async fn anchor(&self, credential_id: Uuid) -> Result<AnchorOutcome, EngineError> {
        let credential = self
            .storage
            .credentials()
            .find_by_id(credential_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("credential {credential_id}")))?;

        let chain = self.registry.chain();
        let network = self.registry.network();

        if let Some(existing) = self
            .storage
            .anchors()
            .find_active(credential_id, chain, network)
            .await?
        {
            if existing.status == AnchorStatus::Pending {
                // A pending row with a hash resumes confirmation polling;
                // a hashless one is a crash leftover from before
                // submission ever returned. Clear it and submit fresh, or
                // the row would block this credential forever.
                if existing.transaction_hash.is_some() {
                    let anchor = self.poll_receipt(existing).await;
                    return Ok(AnchorOutcome::AlreadyAnchored { anchor });
                }
                tracing::warn!(
                    credential_id = %credential_id,
                    anchor_id = %existing.id,
                    "clearing hashless pending anchor left by an interrupted submission"
                );
                self.storage.anchors().delete(existing.id).await?;
            } else {
                return Ok(AnchorOutcome::AlreadyAnchored { anchor: existing });
            }
        }

        let registry_address = match self.registry.registry_address() {
            Some(addr) => addr.to_string(),
            None => {
                return Ok(AnchorOutcome::Skipped {
                    reason: "no registry contract address configured".to_string(),
                })
            }
        };
        if !self.registry.can_write() {
            return Ok(AnchorOutcome::Skipped {
                reason: "no signer address configured".to_string(),
            });
        }

        // Placeholder first: if we lose the race here, the unique index
        // rejects the insert and the surviving row wins.
        let pending = BlockchainAnchor {
            id: Uuid::new_v4(),
            credential_id,
            chain_name: chain,
            network,
            registry_address: registry_address.clone(),
            transaction_hash: None,
            block_number: None,
            status: AnchorStatus::Pending,
            confirmed_at: None,
            confirmation_count: None,
            gas_used: None,
            error: None,
            created_at: Utc::now(),
        };

        match self.storage.anchors().insert_pending(&pending).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(_)) => {
                let winner = self
                    .storage
                    .anchors()
                    .find_active(credential_id, chain, network)
                    .await?
                    .ok_or_else(|| {
                        EngineError::Storage(StorageError::Internal(
                            "anchor row vanished after conflict".to_string(),
                        ))
                    })?;
                tracing::debug!(
                    credential_id = %credential_id,
                    "lost anchor race, returning surviving row"
                );
                return Ok(AnchorOutcome::AlreadyAnchored { anchor: winner });
            }
            Err(e) => return Err(e.into()),
        }

        let tx_hash = match self.submit(&credential, &registry_address).await {
            Ok(hash) => hash,
            Err(ChainError::NoReachableEndpoint {
                attempted,
                last_error,
            }) => {
                self.storage.anchors().delete(pending.id).await?;
                return Ok(AnchorOutcome::Deferred {
                    reason: format!(
                        "no reachable endpoint ({attempted} candidates tried, last: {last_error})"
                    ),
                });
            }
            Err(e @ ChainError::ContractRevert(_)) => {
                self.storage
                    .anchors()
                    .mark_failed(pending.id, &e.to_string())
                    .await?;
                return Err(e.into());
            }
            Err(e) => {
                // Transport failure after every submission attempt. A lost
                // response may still have reached the mempool, so the retry
                // this enables is at-least-once; the registry treats a
                // duplicate issueCredential for the same id as a no-op.
                self.storage.anchors().delete(pending.id).await?;
                return Ok(AnchorOutcome::Deferred {
                    reason: e.to_string(),
                });
            }
        };

        // Record the hash before any confirmation wait
        self.storage
            .anchors()
            .set_transaction_hash(pending.id, &tx_hash)
            .await?;

        tracing::info!(
            credential_id = %credential_id,
            chain = %chain,
            network = %network,
            tx_hash = %tx_hash,
            "anchor transaction submitted"
        );

        let mut anchor = pending;
        anchor.transaction_hash = Some(tx_hash);
        let anchor = self.poll_receipt(anchor).await;

        Ok(AnchorOutcome::Submitted { anchor })
    }

    async fn submit(
        &self,
        credential: &Credential,
        registry_address: &str,
    ) -> Result<String, ChainError> {
        let id_word = identifier_digest(credential.id).to_word();
        let digest_word = credential.content_hash.to_word();
        self.registry
            .issue(registry_address, id_word, digest_word)
            .await
    }

    /// Poll for the receipt of a submitted transaction, updating the row as
    /// the outcome becomes known. Exhausted polls leave the row pending; a
    /// later anchor call resumes from here.
    async fn poll_receipt(&self, mut anchor: BlockchainAnchor) -> BlockchainAnchor {
        let tx_hash = match anchor.transaction_hash.clone() {
            Some(hash) => hash,
            None => return anchor,
        };

        for attempt in 1..=self.receipt_attempts {
            match self.registry.receipt(&tx_hash).await {
                Ok(Some(receipt)) if receipt.succeeded => {
                    let block = receipt.block_number as i64;
                    if let Err(e) = self
                        .storage
                        .anchors()
                        .mark_confirmed(anchor.id, block, 1, receipt.gas_used.as_deref())
                        .await
                    {
                        tracing::error!(anchor_id = %anchor.id, error = %e, "failed to record confirmation");
                        return anchor;
                    }
                    anchor.status = AnchorStatus::Confirmed;
                    anchor.block_number = Some(block);
                    anchor.confirmed_at = Some(Utc::now());
                    anchor.confirmation_count = Some(1);
                    anchor.gas_used = receipt.gas_used;
                    tracing::info!(tx_hash = %tx_hash, block, "anchor confirmed");
                    return anchor;
                }
                Ok(Some(_)) => {
                    let reason = "transaction reverted on-chain".to_string();
                    if let Err(e) = self.storage.anchors().mark_failed(anchor.id, &reason).await {
                        tracing::error!(anchor_id = %anchor.id, error = %e, "failed to record revert");
                        return anchor;
                    }
                    anchor.status = AnchorStatus::Failed;
                    anchor.error = Some(reason);
                    tracing::warn!(tx_hash = %tx_hash, "anchor transaction reverted");
                    return anchor;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, attempt, error = %e, "receipt poll failed");
                }
            }

            if attempt < self.receipt_attempts {
                tokio::time::sleep(self.receipt_interval).await;
            }
        }

        tracing::info!(tx_hash = %tx_hash, "receipt polls exhausted, anchor stays pending");
        anchor
    }

    /// Explorer link for a confirmed anchor on this writer's (chain, network)
    pub fn explorer_url(&self, anchor: &BlockchainAnchor) -> Option<String> {
        anchor
            .transaction_hash
            .as_deref()
            .map(|tx| explorer_tx_url(anchor.chain_name, anchor.network, tx))
    }
}

/// Detached background anchoring: retries deferred outcomes under a bounded
/// exponential backoff and stops on any terminal outcome. Failures are
/// logged, never propagated; the upload that triggered this has long since
/// returned.
pub fn spawn_anchor(
    writer: Arc<AnchorWriter>,
    credential_id: Uuid,
    max_attempts: u32,
) -> tokio::task::JoinHandle<()> {
    let strategy = BackoffStrategy::anchoring();

    tokio::spawn(async move {
        for attempt in 0..max_attempts {
            match writer.anchor(credential_id).await {
                Ok(AnchorOutcome::Deferred { reason }) => {
                    let delay = strategy.delay(attempt);
                    tracing::info!(
                        credential_id = %credential_id,
                        attempt,
                        delay_secs = delay.as_secs(),
                        %reason,
                        "anchoring deferred, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(outcome) => {
                    tracing::debug!(credential_id = %credential_id, ?outcome, "background anchoring done");
                    return;
                }
                Err(e) => {
                    tracing::error!(credential_id = %credential_id, error = %e, "background anchoring failed");
                    return;
                }
            }
        }
        tracing::warn!(
            credential_id = %credential_id,
            max_attempts,
            "background anchoring gave up, anchor remains retryable"
        );
    })
}
