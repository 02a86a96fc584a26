//! On-chain anchor bookkeeping
//!
//! A [`BlockchainAnchor`] row tracks one registry write for one credential
//! on one (chain, network) pair. At most one non-failed row may exist per
//! (credential_id, chain_name, network); the storage layer enforces this
//! with a partial unique index and the anchor writer treats a conflict as
//! "someone else already anchored it".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChainName {
    Polygon,
    Base,
}

impl ChainName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Base => "base",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "polygon" => Some(Self::Polygon),
            "base" => Some(Self::Base),
            _ => None,
        }
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network tier within a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }

    /// Accepts the chain-specific testnet names operators tend to configure
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "testnet" | "mumbai" | "sepolia" => Some(Self::Testnet),
            "mainnet" => Some(Self::Mainnet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of an anchoring transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    /// Row created; transaction submitted or about to be
    Pending,
    /// Transaction mined successfully
    Confirmed,
    /// Transaction reverted or submission failed; terminal
    Failed,
}

impl AnchorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registry write for one credential on one (chain, network)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainAnchor {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub chain_name: ChainName,
    pub network: Network,
    /// Registry contract the write went to
    pub registry_address: String,
    /// Recorded immediately after submission, before confirmation, so a
    /// crash while waiting never loses the hash
    pub transaction_hash: Option<String>,
    pub block_number: Option<i64>,
    pub status: AnchorStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmation_count: Option<i64>,
    /// Stringified to survive chains whose gas values exceed i64
    pub gas_used: Option<String>,
    /// Revert reason or submission error for failed anchors
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BlockchainAnchor {
    pub fn is_confirmed(&self) -> bool {
        self.status == AnchorStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse_accepts_aliases() {
        assert_eq!(Network::parse("testnet"), Some(Network::Testnet));
        assert_eq!(Network::parse("mumbai"), Some(Network::Testnet));
        assert_eq!(Network::parse("sepolia"), Some(Network::Testnet));
        assert_eq!(Network::parse("mainnet"), Some(Network::Mainnet));
        assert_eq!(Network::parse("devnet"), None);
    }

    #[test]
    fn test_chain_round_trip() {
        for chain in [ChainName::Polygon, ChainName::Base] {
            assert_eq!(ChainName::parse(chain.as_str()), Some(chain));
        }
        assert_eq!(ChainName::parse("ethereum"), None);
    }

    #[test]
    fn test_anchor_status_round_trip() {
        for status in [
            AnchorStatus::Pending,
            AnchorStatus::Confirmed,
            AnchorStatus::Failed,
        ] {
            assert_eq!(AnchorStatus::parse(status.as_str()), Some(status));
        }
    }
}
