//! Chain connection settings
//!
//! An immutable configuration struct built once at startup and injected into
//! the client and registry. Nothing in this crate reads the environment
//! after construction.

use crate::endpoints::{fallback_endpoints, rpc_env_key};
use cachet_core::{ChainName, Network};
use std::time::Duration;

/// Default per-endpoint liveness probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(8);

/// Default timeout for a single RPC request on an established connection
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound on write submission attempts (each attempt re-walks the
/// fallback list from the top)
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

/// Settings for one logical (chain, network) pair
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub chain: ChainName,
    pub network: Network,
    /// Ordered candidate endpoints; the operator primary (if any) first
    pub endpoints: Vec<String>,
    /// Funded account whose key is managed by the RPC provider. Absent
    /// means writes are disabled, not an error.
    pub signer_address: Option<String>,
    /// Registry contract address. Absent means anchoring is skipped.
    pub registry_address: Option<String>,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub write_attempts: u32,
}

impl ChainSettings {
    /// Settings with the curated fallback list and default timeouts
    pub fn new(chain: ChainName, network: Network) -> Self {
        Self {
            chain,
            network,
            endpoints: fallback_endpoints(chain, network)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            signer_address: None,
            registry_address: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            write_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }

    /// Build from the environment: `BLOCKCHAIN_CHAIN_NAME`,
    /// `BLOCKCHAIN_NETWORK`, `{CHAIN}_{NETWORK}_RPC_URL`,
    /// `BLOCKCHAIN_SIGNER_ADDRESS`, `CREDENTIALS_CONTRACT_ADDRESS`.
    /// Unrecognized chain/network values fall back to polygon/testnet with
    /// a warning rather than refusing to start.
    pub fn from_env() -> Self {
        let chain = std::env::var("BLOCKCHAIN_CHAIN_NAME")
            .ok()
            .and_then(|v| {
                let parsed = ChainName::parse(&v);
                if parsed.is_none() {
                    tracing::warn!(value = %v, "unrecognized BLOCKCHAIN_CHAIN_NAME, using polygon");
                }
                parsed
            })
            .unwrap_or(ChainName::Polygon);

        let network = std::env::var("BLOCKCHAIN_NETWORK")
            .ok()
            .and_then(|v| {
                let parsed = Network::parse(&v);
                if parsed.is_none() {
                    tracing::warn!(value = %v, "unrecognized BLOCKCHAIN_NETWORK, using testnet");
                }
                parsed
            })
            .unwrap_or(Network::Testnet);

        let mut settings = Self::new(chain, network);

        if let Ok(primary) = std::env::var(rpc_env_key(chain, network)) {
            if !primary.is_empty() {
                settings = settings.with_primary(primary);
            }
        }
        if let Ok(signer) = std::env::var("BLOCKCHAIN_SIGNER_ADDRESS") {
            if !signer.is_empty() {
                settings.signer_address = Some(signer);
            }
        }
        if let Ok(registry) = std::env::var("CREDENTIALS_CONTRACT_ADDRESS") {
            if !registry.is_empty() {
                settings.registry_address = Some(registry);
            }
        }

        settings
    }

    /// Put an operator-configured endpoint ahead of the curated fallbacks
    pub fn with_primary(mut self, url: impl Into<String>) -> Self {
        self.endpoints.insert(0, url.into());
        self
    }

    /// Replace the candidate list entirely (tests, air-gapped deployments)
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_signer(mut self, address: impl Into<String>) -> Self {
        self.signer_address = Some(address.into());
        self
    }

    pub fn with_registry(mut self, address: impl Into<String>) -> Self {
        self.registry_address = Some(address.into());
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Writes need both a signer and a registry address
    pub fn writes_enabled(&self) -> bool {
        self.signer_address.is_some() && self.registry_address.is_some()
    }
}

/// Well-formed Ethereum address: 0x + 40 hex chars
pub fn is_valid_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_goes_first() {
        let settings = ChainSettings::new(ChainName::Polygon, Network::Testnet)
            .with_primary("https://operator.example.com");
        assert_eq!(settings.endpoints[0], "https://operator.example.com");
        assert_eq!(
            settings.endpoints[1],
            "https://polygon-mumbai-bor.publicnode.com"
        );
    }

    #[test]
    fn test_writes_need_signer_and_registry() {
        let base = ChainSettings::new(ChainName::Base, Network::Testnet);
        assert!(!base.writes_enabled());
        assert!(!base
            .clone()
            .with_signer("0x0000000000000000000000000000000000000001")
            .writes_enabled());
        assert!(base
            .with_signer("0x0000000000000000000000000000000000000001")
            .with_registry("0x0000000000000000000000000000000000000002")
            .writes_enabled());
    }

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_address(
            "0x0000000000000000000000000000000000000000"
        ));
        assert!(is_valid_address(
            "0xAbCdEf0123456789AbCdEf0123456789AbCdEf01"
        ));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x"));
        assert!(!is_valid_address("0x123"));
        assert!(!is_valid_address(
            "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef00"
        ));
        assert!(!is_valid_address(
            "0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG"
        ));
    }
}
