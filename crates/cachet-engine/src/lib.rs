//! # Cachet Engine
//!
//! The credential lifecycle engine, composing the core hasher, the chain
//! client, and the persistence layer:
//!
//! - [`CredentialIntake`] — upload: digest, blob write, row insert,
//!   background anchoring
//! - [`AnchorWriter`] — idempotent on-chain anchoring with crash-safe
//!   bookkeeping
//! - [`VerificationResolver`] — public token to trust verdict
//! - [`RevocationLedger`] — local-first revocation with an append-only
//!   audit trail

pub mod anchor;
pub mod backoff;
pub mod error;
pub mod intake;
pub mod resolver;
pub mod revocation;

pub use anchor::{spawn_anchor, AnchorOutcome, AnchorWriter};
pub use backoff::BackoffStrategy;
pub use error::EngineError;
pub use intake::{CredentialIntake, NewCredential};
pub use resolver::VerificationResolver;
pub use revocation::RevocationLedger;
