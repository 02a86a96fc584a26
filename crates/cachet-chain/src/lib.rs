//! # Cachet Chain
//!
//! EVM connectivity for the credential registry.
//!
//! Public RPC providers for the supported networks are individually
//! unreliable, so connectivity is built around an ordered fallback list:
//! [`ChainClient::connect`] probes candidates one at a time and pins the
//! first live endpoint for the rest of the operation. On top of that,
//! [`RegistryBackend`] exposes the four registry contract calls the rest of
//! the system needs, with calldata encoded in-crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cachet_chain::{ChainSettings, EvmRegistry, RegistryBackend};
//! use cachet_core::{ChainName, Network};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ChainSettings::new(ChainName::Polygon, Network::Testnet)
//!         .with_registry("0x1B3cB8fa385C20747f5a58e740eaf63b6a29d0a8");
//!     let registry = EvmRegistry::new(settings)?;
//!
//!     let total = registry.total("0x1B3cB8fa385C20747f5a58e740eaf63b6a29d0a8").await?;
//!     println!("credentials recorded: {total}");
//!
//!     Ok(())
//! }
//! ```

mod client;
mod endpoints;
mod error;
mod registry;
mod settings;

pub use client::{ChainClient, ChainConnection, TxReceipt};
pub use endpoints::{chain_id, explorer_tx_url, fallback_endpoints, rpc_env_key};
pub use error::ChainError;
pub use registry::{EvmRegistry, RegistryBackend, RegistryEntry};
pub use settings::{is_valid_address, ChainSettings};
