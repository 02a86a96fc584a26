//! Error types for chain operations

use thiserror::Error;

/// Errors that can occur while talking to a chain
#[derive(Debug, Error)]
pub enum ChainError {
    /// A single endpoint was unreachable, timed out, or spoke garbage.
    /// Absorbed by the fallback loop; callers of `connect` only ever see
    /// `NoReachableEndpoint`.
    #[error("transport error: {0}")]
    Transport(String),

    /// Every candidate endpoint failed. Carries the last underlying error
    /// for diagnostics.
    #[error("no reachable RPC endpoint after {attempted} candidates (last error: {last_error})")]
    NoReachableEndpoint { attempted: usize, last_error: String },

    /// The registry contract rejected the call. A logical chain-side
    /// condition, never retried.
    #[error("contract revert: {0}")]
    ContractRevert(String),

    /// The endpoint answered with something that does not decode
    #[error("malformed RPC response: {0}")]
    InvalidResponse(String),

    /// A write was requested but no signer or registry address is
    /// configured, or an address is malformed
    #[error("chain writes not configured: {0}")]
    NotConfigured(String),
}

impl ChainError {
    /// Transport-class errors are the only ones worth retrying on a fresh
    /// endpoint; everything else is deterministic.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::NoReachableEndpoint { .. }
        )
    }
}
