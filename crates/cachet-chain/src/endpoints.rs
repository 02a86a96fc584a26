//! Curated public RPC endpoints and explorer links per (chain, network)
//!
//! The lists are ordered: earlier entries are preferred. An operator-provided
//! primary URL (see [`ChainSettings`](crate::ChainSettings)) is always tried
//! before any of these.

use cachet_core::{ChainName, Network};

/// Public fallback endpoints, in probe order
pub fn fallback_endpoints(chain: ChainName, network: Network) -> &'static [&'static str] {
    match (chain, network) {
        (ChainName::Polygon, Network::Testnet) => &[
            "https://polygon-mumbai-bor.publicnode.com",
            "https://rpc.ankr.com/polygon_mumbai",
            "https://polygon-mumbai.blockpi.network/v1/rpc/public",
            "https://endpoints.omniatech.io/v1/matic/mumbai/public",
            "https://matic-mumbai.chainstacklabs.com",
        ],
        (ChainName::Polygon, Network::Mainnet) => &[
            "https://polygon-rpc.com",
            "https://rpc-mainnet.maticvigil.com",
            "https://matic-mainnet.chainstacklabs.com",
        ],
        (ChainName::Base, Network::Testnet) => &[
            "https://sepolia.base.org",
            "https://base-sepolia.g.alchemy.com/v2/demo",
        ],
        (ChainName::Base, Network::Mainnet) => &[
            "https://mainnet.base.org",
            "https://base.g.alchemy.com/v2/demo",
        ],
    }
}

/// EVM chain id for the pair
pub fn chain_id(chain: ChainName, network: Network) -> u64 {
    match (chain, network) {
        (ChainName::Polygon, Network::Mainnet) => 137,
        (ChainName::Polygon, Network::Testnet) => 80001,
        (ChainName::Base, Network::Mainnet) => 8453,
        (ChainName::Base, Network::Testnet) => 84532,
    }
}

/// Environment variable that overrides the primary RPC endpoint,
/// e.g. `POLYGON_TESTNET_RPC_URL`
pub fn rpc_env_key(chain: ChainName, network: Network) -> String {
    format!(
        "{}_{}_RPC_URL",
        chain.as_str().to_uppercase(),
        network.as_str().to_uppercase()
    )
}

/// Block-explorer link for a transaction
pub fn explorer_tx_url(chain: ChainName, network: Network, tx_hash: &str) -> String {
    let host = match (chain, network) {
        (ChainName::Polygon, Network::Mainnet) => "polygonscan.com",
        (ChainName::Polygon, Network::Testnet) => "mumbai.polygonscan.com",
        (ChainName::Base, Network::Mainnet) => "basescan.org",
        (ChainName::Base, Network::Testnet) => "sepolia.basescan.org",
    };
    format!("https://{}/tx/{}", host, tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pair_has_fallbacks() {
        for chain in [ChainName::Polygon, ChainName::Base] {
            for network in [Network::Testnet, Network::Mainnet] {
                assert!(!fallback_endpoints(chain, network).is_empty());
            }
        }
    }

    #[test]
    fn test_polygon_testnet_order() {
        let list = fallback_endpoints(ChainName::Polygon, Network::Testnet);
        assert_eq!(list.len(), 5);
        assert_eq!(list[0], "https://polygon-mumbai-bor.publicnode.com");
    }

    #[test]
    fn test_chain_ids() {
        assert_eq!(chain_id(ChainName::Polygon, Network::Mainnet), 137);
        assert_eq!(chain_id(ChainName::Polygon, Network::Testnet), 80001);
        assert_eq!(chain_id(ChainName::Base, Network::Mainnet), 8453);
        assert_eq!(chain_id(ChainName::Base, Network::Testnet), 84532);
    }

    #[test]
    fn test_env_key_format() {
        assert_eq!(
            rpc_env_key(ChainName::Polygon, Network::Testnet),
            "POLYGON_TESTNET_RPC_URL"
        );
        assert_eq!(
            rpc_env_key(ChainName::Base, Network::Mainnet),
            "BASE_MAINNET_RPC_URL"
        );
    }

    #[test]
    fn test_explorer_urls() {
        assert_eq!(
            explorer_tx_url(ChainName::Polygon, Network::Testnet, "0xabc"),
            "https://mumbai.polygonscan.com/tx/0xabc"
        );
        assert_eq!(
            explorer_tx_url(ChainName::Base, Network::Mainnet, "0xdef"),
            "https://basescan.org/tx/0xdef"
        );
    }
}
