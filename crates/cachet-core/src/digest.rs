//! Canonical credential fingerprints
//!
//! A credential's fingerprint covers its file bytes plus the claim fields
//! that are part of what is being asserted (title, issuer, issue date), not
//! operational bookkeeping. Metadata is serialized as RFC 8785 canonical
//! JSON so the digest is identical on any machine, on any run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Number of hex characters in a rendered digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Domain separator between file bytes and canonical claim bytes.
const CLAIM_SEPARATOR: [u8; 1] = [0x1e];

/// Domain prefix for on-chain identifier hashes, so the registry key can
/// never be confused with (or reversed into) a content digest.
const IDENTIFIER_DOMAIN: &[u8] = b"cachet/credential-id:";

/// Errors from digest parsing and fixed-width conversion.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The hex form has the wrong length. Hard precondition: a malformed
    /// word silently corrupts on-chain comparisons, so this is never
    /// padded or truncated away.
    #[error("digest must be {expected} hex characters, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    /// The string is the right length but not valid hex.
    #[error("digest is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A SHA-256 content digest (32 bytes), rendered as 64 lowercase hex chars.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Create a digest from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Parse the 64-hex-char form, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidDigestLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        let raw = hex::decode(s)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    /// Get hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The fixed-width word the on-chain registry stores
    pub fn to_word(&self) -> [u8; 32] {
        self.0
    }

    /// Constant-time equality, for comparing a recomputed digest against a
    /// stored one without leaking the matching prefix length
    pub fn ct_eq(&self, other: &ContentDigest) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The claim subset covered by a credential's fingerprint.
///
/// Only fields that are part of the assertion itself belong here. Adding an
/// operational field (status, view counts, storage paths) would make stored
/// digests unverifiable.
#[derive(Debug, Serialize)]
pub struct CanonicalClaim<'a> {
    pub title: &'a str,
    pub issuer_id: Option<Uuid>,
    pub issued_date: Option<NaiveDate>,
}

/// Compute the canonical fingerprint of a credential: SHA-256 over the file
/// bytes, a separator, and the RFC 8785 (JCS) serialization of the claim.
pub fn content_digest(bytes: &[u8], claim: &CanonicalClaim<'_>) -> ContentDigest {
    let claim_bytes = match serde_jcs::to_vec(claim) {
        Ok(jcs) => jcs,
        // Fallback (should not happen for a struct this simple); still
        // deterministic for a given claim.
        Err(_) => format!(
            "{}:{:?}:{:?}",
            claim.title, claim.issuer_id, claim.issued_date
        )
        .into_bytes(),
    };

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.update(CLAIM_SEPARATOR);
    hasher.update(&claim_bytes);
    ContentDigest(hasher.finalize().into())
}

/// Hash a credential id into its on-chain registry key. Distinct from the
/// content digest so the chain never learns raw credential ids.
pub fn identifier_digest(credential_id: Uuid) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(IDENTIFIER_DOMAIN);
    hasher.update(credential_id.as_bytes());
    ContentDigest(hasher.finalize().into())
}

/// Validate a stored hex digest into the exact 32-byte word the registry
/// contract expects. Fails with [`DigestError::InvalidDigestLength`] for any
/// input that is not exactly 64 hex characters.
pub fn to_bytes32(hex_digest: &str) -> Result<[u8; 32], DigestError> {
    ContentDigest::from_hex(hex_digest).map(|d| d.to_word())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> CanonicalClaim<'static> {
        CanonicalClaim {
            title: "Rust Proficiency Certificate",
            issuer_id: Some(Uuid::nil()),
            issued_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        }
    }

    #[test]
    fn test_digest_is_deterministic() {
        let bytes = b"certificate body";
        let a = content_digest(bytes, &claim());
        let b = content_digest(bytes, &claim());
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = content_digest(b"certificate body", &claim());
        let b = content_digest(b"certificate bodY", &claim());
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_changes_with_claim() {
        let bytes = b"certificate body";
        let a = content_digest(bytes, &claim());
        let other = CanonicalClaim {
            title: "Another Title",
            ..claim()
        };
        let b = content_digest(bytes, &other);
        assert_ne!(a, b);
    }

    #[test]
    fn test_claim_separator_prevents_ambiguity() {
        // Moving a byte across the bytes/claim boundary must change the digest.
        let a = content_digest(
            b"ab",
            &CanonicalClaim {
                title: "c",
                issuer_id: None,
                issued_date: None,
            },
        );
        let b = content_digest(
            b"abc",
            &CanonicalClaim {
                title: "",
                issuer_id: None,
                issued_date: None,
            },
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_round_trip() {
        let digest = ContentDigest::digest(b"round trip");
        let parsed = ContentDigest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn test_from_hex_accepts_0x_prefix() {
        let digest = ContentDigest::digest(b"prefixed");
        let parsed = ContentDigest::from_hex(&format!("0x{}", digest.to_hex())).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn test_to_bytes32_rejects_short_input() {
        let err = to_bytes32("abcd").unwrap_err();
        assert!(matches!(
            err,
            DigestError::InvalidDigestLength {
                expected: 64,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_to_bytes32_rejects_long_input() {
        let long = "a".repeat(65);
        let err = to_bytes32(&long).unwrap_err();
        assert!(matches!(
            err,
            DigestError::InvalidDigestLength { actual: 65, .. }
        ));
    }

    #[test]
    fn test_to_bytes32_rejects_non_hex() {
        let bad = "g".repeat(64);
        assert!(matches!(
            to_bytes32(&bad),
            Err(DigestError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_to_bytes32_matches_digest_word() {
        let digest = ContentDigest::digest(b"word");
        let word = to_bytes32(&digest.to_hex()).unwrap();
        assert_eq!(word, digest.to_word());
    }

    #[test]
    fn test_identifier_digest_differs_from_content_digest() {
        let id = Uuid::new_v4();
        let id_hash = identifier_digest(id);
        // Hashing the raw uuid bytes without the domain prefix must not collide.
        let plain = ContentDigest::digest(id.as_bytes());
        assert_ne!(id_hash, plain);
    }

    #[test]
    fn test_constant_time_compare() {
        let a = ContentDigest::digest(b"same");
        let b = ContentDigest::digest(b"same");
        let c = ContentDigest::digest(b"different");
        assert!(a.ct_eq(&b));
        assert!(!a.ct_eq(&c));
    }
}
