//! Credential registry contract bindings
//!
//! The on-chain registry is a bytes32-keyed map: `issueCredential` records a
//! (credential identifier hash, content digest) pair, `revokeCredential`
//! flips its revoked flag, and `verifyCredential` reads it back. Calldata is
//! hand-encoded as a 4-byte keccak selector plus 32-byte words; the ABI here
//! is narrow enough that a full codegen binding would be overkill.

use async_trait::async_trait;
use cachet_core::{ChainName, Network};
use sha3::{Digest, Keccak256};

use crate::client::{ChainClient, TxReceipt};
use crate::error::ChainError;
use crate::settings::ChainSettings;

const SIG_ISSUE: &str = "issueCredential(bytes32,bytes32)";
const SIG_REVOKE: &str = "revokeCredential(bytes32)";
const SIG_VERIFY: &str = "verifyCredential(bytes32,bytes32)";
const SIG_TOTAL: &str = "getTotalCredentials()";

/// What the registry knows about one credential identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub exists: bool,
    pub revoked: bool,
    /// Whether the digest we supplied matches the digest recorded on-chain
    pub digest_matches: bool,
}

/// Access to a credential registry contract.
///
/// Implementations must never conflate a contract revert with a transport
/// failure: reverts are terminal, transport failures are retryable.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    fn chain(&self) -> ChainName;

    fn network(&self) -> Network;

    /// Registry contract this backend is configured to talk to, if any
    fn registry_address(&self) -> Option<&str>;

    /// Whether submitting transactions is possible (a signer is configured)
    fn can_write(&self) -> bool;

    /// Record a credential on-chain; returns the transaction hash
    async fn issue(
        &self,
        registry: &str,
        id_word: [u8; 32],
        digest_word: [u8; 32],
    ) -> Result<String, ChainError>;

    /// Flag a recorded credential as revoked; returns the transaction hash
    async fn revoke(&self, registry: &str, id_word: [u8; 32]) -> Result<String, ChainError>;

    /// Look up a credential identifier and check the supplied digest
    async fn entry(
        &self,
        registry: &str,
        id_word: [u8; 32],
        digest_word: [u8; 32],
    ) -> Result<RegistryEntry, ChainError>;

    /// Number of credentials the registry has recorded
    async fn total(&self, registry: &str) -> Result<u64, ChainError>;

    /// Receipt for a previously submitted transaction; `None` while pending
    async fn receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, ChainError>;
}

/// Live EVM-backed registry
#[derive(Debug, Clone)]
pub struct EvmRegistry {
    client: ChainClient,
}

impl EvmRegistry {
    pub fn new(settings: ChainSettings) -> Result<Self, ChainError> {
        Ok(Self {
            client: ChainClient::new(settings)?,
        })
    }

    pub fn from_env() -> Result<Self, ChainError> {
        Self::new(ChainSettings::from_env())
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    fn signer(&self) -> Result<&str, ChainError> {
        self.client
            .settings()
            .signer_address
            .as_deref()
            .ok_or_else(|| ChainError::NotConfigured("no signer address configured".to_string()))
    }

    /// Submit calldata, re-walking the fallback list between attempts.
    ///
    /// A transport failure after a successful probe usually means the chosen
    /// endpoint degraded mid-flight, so each retry reconnects from the top of
    /// the candidate list. Reverts are returned immediately: resubmitting a
    /// transaction the contract rejected cannot succeed.
    async fn submit(&self, registry: &str, data: &str) -> Result<String, ChainError> {
        let signer = self.signer()?;
        let attempts = self.client.settings().write_attempts.max(1);
        let mut last = ChainError::Transport("no submission attempts made".to_string());

        for attempt in 1..=attempts {
            let conn = self.client.connect().await?;
            match conn.send_transaction(signer, registry, data).await {
                Ok(tx_hash) => return Ok(tx_hash),
                Err(e @ ChainError::ContractRevert(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        endpoint = %conn.endpoint(),
                        error = %e,
                        "transaction submission failed"
                    );
                    last = e;
                }
            }
        }

        Err(last)
    }
}

#[async_trait]
impl RegistryBackend for EvmRegistry {
    fn chain(&self) -> ChainName {
        self.client.settings().chain
    }

    fn network(&self) -> Network {
        self.client.settings().network
    }

    fn registry_address(&self) -> Option<&str> {
        self.client.settings().registry_address.as_deref()
    }

    fn can_write(&self) -> bool {
        self.client.settings().writes_enabled()
    }

    async fn issue(
        &self,
        registry: &str,
        id_word: [u8; 32],
        digest_word: [u8; 32],
    ) -> Result<String, ChainError> {
        let data = calldata(SIG_ISSUE, &[id_word, digest_word]);
        self.submit(registry, &data).await
    }

    async fn revoke(&self, registry: &str, id_word: [u8; 32]) -> Result<String, ChainError> {
        let data = calldata(SIG_REVOKE, &[id_word]);
        self.submit(registry, &data).await
    }

    async fn entry(
        &self,
        registry: &str,
        id_word: [u8; 32],
        digest_word: [u8; 32],
    ) -> Result<RegistryEntry, ChainError> {
        let conn = self.client.connect().await?;
        let raw = conn
            .call(registry, &calldata(SIG_VERIFY, &[id_word, digest_word]))
            .await?;

        Ok(RegistryEntry {
            exists: decode_bool_word(&raw, 0)?,
            revoked: decode_bool_word(&raw, 1)?,
            digest_matches: decode_bool_word(&raw, 2)?,
        })
    }

    async fn total(&self, registry: &str) -> Result<u64, ChainError> {
        let conn = self.client.connect().await?;
        let raw = conn.call(registry, &calldata(SIG_TOTAL, &[])).await?;
        decode_u64_word(&raw, 0)
    }

    async fn receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        let conn = self.client.connect().await?;
        conn.transaction_receipt(tx_hash).await
    }
}

/// First four bytes of the keccak-256 hash of a Solidity function signature
fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn calldata(signature: &str, words: &[[u8; 32]]) -> String {
    let mut data = String::with_capacity(10 + words.len() * 64);
    data.push_str("0x");
    data.push_str(&hex::encode(selector(signature)));
    for word in words {
        data.push_str(&hex::encode(word));
    }
    data
}

fn word_segment(data: &str, index: usize) -> Result<&str, ChainError> {
    let data = data.strip_prefix("0x").unwrap_or(data);
    let start = index * 64;
    data.get(start..start + 64).ok_or_else(|| {
        ChainError::InvalidResponse(format!("return data too short for word {index}"))
    })
}

fn decode_bool_word(data: &str, index: usize) -> Result<bool, ChainError> {
    Ok(word_segment(data, index)?.bytes().any(|b| b != b'0'))
}

fn decode_u64_word(data: &str, index: usize) -> Result<u64, ChainError> {
    let segment = word_segment(data, index)?;
    let (high, low) = segment.split_at(48);
    if high.bytes().any(|b| b != b'0') {
        return Err(ChainError::InvalidResponse(format!(
            "uint256 word {index} exceeds u64"
        )));
    }
    u64::from_str_radix(low, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad uint word {index}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ERC-20 transfer selector, the canonical keccak test vector
    #[test]
    fn test_selector_derivation() {
        assert_eq!(
            selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
    }

    #[test]
    fn test_selectors_are_distinct() {
        let all = [
            selector(SIG_ISSUE),
            selector(SIG_REVOKE),
            selector(SIG_VERIFY),
            selector(SIG_TOTAL),
        ];
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j]);
            }
        }
    }

    #[test]
    fn test_calldata_layout() {
        let id = [0xabu8; 32];
        let digest = [0x01u8; 32];
        let data = calldata(SIG_ISSUE, &[id, digest]);

        assert!(data.starts_with("0x"));
        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert_eq!(&data[10..74], "ab".repeat(32));
        assert_eq!(&data[74..], "01".repeat(32));
    }

    #[test]
    fn test_decode_bool_words() {
        let one = format!("{:0>64}", "1");
        let zero = "0".repeat(64);
        let data = format!("0x{one}{zero}{one}");

        assert!(decode_bool_word(&data, 0).unwrap());
        assert!(!decode_bool_word(&data, 1).unwrap());
        assert!(decode_bool_word(&data, 2).unwrap());
        assert!(decode_bool_word(&data, 3).is_err());
    }

    #[test]
    fn test_decode_u64_word() {
        let data = format!("0x{:0>64}", "2a");
        assert_eq!(decode_u64_word(&data, 0).unwrap(), 42);

        let too_big = format!("0x1{}", "0".repeat(63));
        assert!(decode_u64_word(&too_big, 0).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        assert!(decode_bool_word("0x0001", 0).is_err());
        assert!(decode_u64_word("", 0).is_err());
    }
}
