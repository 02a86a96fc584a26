//! Verification verdicts
//!
//! A [`VerificationReport`] is computed fresh on every request and never
//! persisted; [`VerificationLog`] rows are the append-only audit copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// The definitive result enum rendered to anonymous verifiers. The public
/// page always shows one of these, never a raw error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Hash matches; not revoked, not expired
    Valid,
    /// Past its expiry date (hash may still match, see the report)
    Expired,
    /// Revoked; wins over every other signal
    Revoked,
    /// Stored content no longer matches the recorded fingerprint
    Mismatch,
    /// Token unknown, or the credential is not publicly resolvable.
    /// Deliberately indistinguishable between the two.
    NotFound,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Mismatch => "mismatch",
            Self::NotFound => "not_found",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(Self::Valid),
            "expired" => Some(Self::Expired),
            "revoked" => Some(Self::Revoked),
            "mismatch" => Some(Self::Mismatch),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict for one verification request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationReport {
    pub result: VerificationOutcome,
    /// Whether the recomputed digest equals the stored one
    pub hash_match: bool,
    /// Whether a confirmed anchor exists and the chain agrees with the
    /// stored digest. Chain failures degrade this to false, they never fail
    /// the verification.
    pub blockchain_verified: bool,
    /// Explorer link to the anchoring transaction, when one is confirmed
    pub explorer_url: Option<String>,
}

impl VerificationReport {
    /// Report for an unresolvable token: nothing matched, nothing revealed
    pub fn not_found() -> Self {
        Self {
            result: VerificationOutcome::NotFound,
            hash_match: false,
            blockchain_verified: false,
            explorer_url: None,
        }
    }
}

/// Caller metadata captured for the verification log
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Append-only audit row for one public verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationLog {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub qr_token: String,
    pub result: VerificationOutcome,
    pub hash_match: bool,
    pub blockchain_verified: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_round_trip() {
        for outcome in [
            VerificationOutcome::Valid,
            VerificationOutcome::Expired,
            VerificationOutcome::Revoked,
            VerificationOutcome::Mismatch,
            VerificationOutcome::NotFound,
        ] {
            assert_eq!(VerificationOutcome::parse(outcome.as_str()), Some(outcome));
        }
    }

    #[test]
    fn test_not_found_report_reveals_nothing() {
        let report = VerificationReport::not_found();
        assert_eq!(report.result, VerificationOutcome::NotFound);
        assert!(!report.hash_match);
        assert!(!report.blockchain_verified);
        assert!(report.explorer_url.is_none());
    }
}
