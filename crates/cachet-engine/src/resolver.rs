//! Verification resolver
//!
//! Turns a public qr token into a verdict safe to show an anonymous
//! visitor. The check order is load-bearing: revocation wins
//! unconditionally, then expiry, then the local hash recompute; the chain
//! read only corroborates and any chain failure degrades rather than
//! failing the verification.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use cachet_chain::{explorer_tx_url, RegistryBackend};
use cachet_core::{
    content_digest, identifier_digest, Credential, IssuerSummary, PublicCredential, RequestMeta,
    VerificationLog, VerificationOutcome, VerificationReport,
};
use cachet_persist::{BlobStore, Storage};

use crate::error::EngineError;

/// Resolves public verification requests
pub struct VerificationResolver {
    storage: Storage,
    blobs: Arc<dyn BlobStore>,
    registry: Arc<dyn RegistryBackend>,
}

impl VerificationResolver {
    pub fn new(
        storage: Storage,
        blobs: Arc<dyn BlobStore>,
        registry: Arc<dyn RegistryBackend>,
    ) -> Self {
        Self {
            storage,
            blobs,
            registry,
        }
    }

    /// Resolve a token to a public view and a verdict.
    ///
    /// `None` means the token is unknown or the credential is private; the
    /// two cases are deliberately indistinguishable so the endpoint leaks no
    /// existence information.
    pub async fn verify(
        &self,
        token: &str,
        meta: &RequestMeta,
    ) -> Result<Option<(PublicCredential, VerificationReport)>, EngineError> {
        let credential = match self.storage.credentials().find_by_qr_token(token).await? {
            Some(c) if c.visibility.publicly_resolvable() => c,
            _ => return Ok(None),
        };

        let report = self.build_report(&credential).await;

        // Side effects are best-effort: the verdict renders even if the
        // counter bump or the audit row fails.
        self.record(&credential, token, &report, meta).await;

        let issuer = self.issuer_summary(&credential).await;
        Ok(Some((credential.public_view(issuer), report)))
    }

    async fn build_report(&self, credential: &Credential) -> VerificationReport {
        // Revocation wins regardless of hash or chain state; no chain lag
        // can resurrect a revoked credential.
        if credential.is_revoked() {
            return VerificationReport {
                result: VerificationOutcome::Revoked,
                hash_match: false,
                blockchain_verified: false,
                explorer_url: None,
            };
        }

        let hash_match = self.recompute_hash(credential).await;

        if credential.is_expired() {
            // The report still carries a truthful hash_match so an expired
            // but intact credential reads differently from a tampered one.
            return VerificationReport {
                result: VerificationOutcome::Expired,
                hash_match,
                blockchain_verified: false,
                explorer_url: None,
            };
        }

        let (blockchain_verified, explorer_url) = self.check_chain(credential).await;

        let result = if hash_match {
            VerificationOutcome::Valid
        } else {
            // Local tampering outranks a stale but "valid" on-chain record
            VerificationOutcome::Mismatch
        };

        VerificationReport {
            result,
            hash_match,
            blockchain_verified,
            explorer_url,
        }
    }

    /// Recompute the canonical digest of the stored bytes and compare it to
    /// the recorded one in constant time. A missing or unreadable blob
    /// degrades to a non-match rather than an error.
    async fn recompute_hash(&self, credential: &Credential) -> bool {
        let bytes = match self.blobs.get(&credential.storage_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!(
                    credential_id = %credential.id,
                    path = %credential.storage_path,
                    "stored file missing during verification"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(
                    credential_id = %credential.id,
                    error = %e,
                    "blob read failed during verification"
                );
                return false;
            }
        };

        let recomputed = content_digest(&bytes, &credential.canonical_claim());
        recomputed.ct_eq(&credential.content_hash)
    }

    /// Corroborate against the chain when a confirmed anchor exists. Chain
    /// failures degrade `blockchain_verified` to false, they never fail the
    /// verification.
    async fn check_chain(&self, credential: &Credential) -> (bool, Option<String>) {
        let anchor = match self
            .storage
            .anchors()
            .find_active(credential.id, self.registry.chain(), self.registry.network())
            .await
        {
            Ok(Some(anchor)) if anchor.is_confirmed() => anchor,
            Ok(_) => return (false, None),
            Err(e) => {
                tracing::warn!(credential_id = %credential.id, error = %e, "anchor lookup failed");
                return (false, None);
            }
        };

        let explorer_url = anchor
            .transaction_hash
            .as_deref()
            .map(|tx| explorer_tx_url(anchor.chain_name, anchor.network, tx));

        let id_word = identifier_digest(credential.id).to_word();
        let digest_word = credential.content_hash.to_word();

        match self
            .registry
            .entry(&anchor.registry_address, id_word, digest_word)
            .await
        {
            Ok(entry) => {
                let verified = entry.exists && !entry.revoked && entry.digest_matches;
                (verified, explorer_url)
            }
            Err(e) => {
                tracing::warn!(
                    credential_id = %credential.id,
                    error = %e,
                    "chain read failed, degrading blockchain_verified"
                );
                (false, explorer_url)
            }
        }
    }

    async fn issuer_summary(&self, credential: &Credential) -> Option<IssuerSummary> {
        let issuer_id = credential.issuer_id?;
        match self.storage.issuers().find_by_id(issuer_id).await {
            Ok(Some(issuer)) if issuer.is_active => Some(issuer.summary()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(issuer_id = %issuer_id, error = %e, "issuer lookup failed");
                None
            }
        }
    }

    async fn record(
        &self,
        credential: &Credential,
        token: &str,
        report: &VerificationReport,
        meta: &RequestMeta,
    ) {
        if let Err(e) = self
            .storage
            .credentials()
            .record_verification(credential.id)
            .await
        {
            tracing::warn!(credential_id = %credential.id, error = %e, "verification counter bump failed");
        }

        let log = VerificationLog {
            id: Uuid::new_v4(),
            credential_id: credential.id,
            qr_token: token.to_string(),
            result: report.result,
            hash_match: report.hash_match,
            blockchain_verified: report.blockchain_verified,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            referrer: meta.referrer.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.storage.verification_logs().append(&log).await {
            tracing::warn!(credential_id = %credential.id, error = %e, "verification log append failed");
        }
    }
}
