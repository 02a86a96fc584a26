//! # Cachet Core
//!
//! Core types for the Cachet credential engine:
//! - [`ContentDigest`] — fixed-width canonical fingerprint of a credential
//! - [`Credential`] — the claim record, its status and trust tiers
//! - [`BlockchainAnchor`] — bookkeeping for on-chain registry writes
//! - [`RevocationEvent`] — append-only status-change ledger entries
//! - [`VerificationReport`] — the verdict published to anonymous verifiers

pub mod anchor;
pub mod credential;
pub mod digest;
pub mod revocation;
pub mod verification;

pub use anchor::{AnchorStatus, BlockchainAnchor, ChainName, Network};
pub use credential::{
    Credential, CredentialIssuer, CredentialStatus, IssuerSummary, PublicCredential, QrToken,
    TrustLevel, Visibility,
};
pub use digest::{
    content_digest, identifier_digest, to_bytes32, CanonicalClaim, ContentDigest, DigestError,
};
pub use revocation::{ActorRole, RevocationEvent};
pub use verification::{RequestMeta, VerificationLog, VerificationOutcome, VerificationReport};
