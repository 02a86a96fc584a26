//! Credential records and their lifecycle enums
//!
//! A [`Credential`] is never physically deleted: its `status` transitions to
//! `revoked` instead, and the revocation ledger keeps the history.

use crate::digest::ContentDigest;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Live and verifiable
    Active,
    /// Past its expiry date
    Expired,
    /// Withdrawn by the holder, issuer, or an admin; terminal
    Revoked,
    /// Temporarily withheld without revoking
    Suspended,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "revoked" => Some(Self::Revoked),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assertion-strength tier attached to a credential, independent of its
/// verification result. Transitions are monotonically non-decreasing except
/// on explicit downgrade by an authorized reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Uploaded by the holder, nothing checked
    SelfAsserted,
    /// Passed automated plausibility checks
    AiChecked,
    /// A human reviewer looked at it
    Reviewed,
    /// The issuer itself vouches for it
    IssuerSigned,
}

impl TrustLevel {
    /// Ordering rank for the monotonicity rule
    pub fn rank(&self) -> u8 {
        match self {
            Self::SelfAsserted => 0,
            Self::AiChecked => 1,
            Self::Reviewed => 2,
            Self::IssuerSigned => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfAsserted => "self_asserted",
            Self::AiChecked => "ai_checked",
            Self::Reviewed => "reviewed",
            Self::IssuerSigned => "issuer_signed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "self_asserted" => Some(Self::SelfAsserted),
            "ai_checked" => Some(Self::AiChecked),
            "reviewed" => Some(Self::Reviewed),
            "issuer_signed" => Some(Self::IssuerSigned),
            _ => None,
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who can resolve a credential through the public endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Listed and resolvable by anyone
    Public,
    /// Resolvable only by whoever holds the qr_token
    LinkOnly,
    /// Not resolvable through the public endpoint at all
    Private,
}

impl Visibility {
    /// Whether the public verification endpoint may resolve this credential.
    /// `link_only` resolves: possession of the token is the capability.
    pub fn publicly_resolvable(&self) -> bool {
        !matches!(self, Self::Private)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::LinkOnly => "link_only",
            Self::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "link_only" => Some(Self::LinkOnly),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The opaque, unguessable public lookup key for a credential.
///
/// Stable for the credential's lifetime and the only identifier ever exposed
/// to anonymous verifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrToken(String);

impl QrToken {
    /// Generate a fresh token: 32 random bytes, lowercase hex
    pub fn generate() -> Self {
        Self(hex::encode(rand::random::<[u8; 32]>()))
    }

    /// Wrap a stored token
    pub fn from_string(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for QrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    /// Owning user; authorization for revoke/anchor checks against this
    pub holder_id: Uuid,
    pub issuer_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub credential_type: Option<String>,
    pub category: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: CredentialStatus,
    pub trust_level: TrustLevel,
    pub visibility: Visibility,
    pub qr_token: QrToken,
    /// Canonical fingerprint of the stored file + claim metadata
    pub content_hash: ContentDigest,
    /// Opaque blob-store key for the uploaded file
    pub storage_path: String,
    pub verification_count: i64,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// Check whether the expiry date (if any) is in the past
    pub fn is_expired(&self) -> bool {
        self.expiry_date
            .map_or(false, |d| d < Utc::now().date_naive())
    }

    pub fn is_revoked(&self) -> bool {
        self.status == CredentialStatus::Revoked
    }

    /// The claim subset covered by the content digest
    pub fn canonical_claim(&self) -> crate::digest::CanonicalClaim<'_> {
        crate::digest::CanonicalClaim {
            title: &self.title,
            issuer_id: self.issuer_id,
            issued_date: self.issued_date,
        }
    }

    /// Project the public-visibility field subset for anonymous verifiers
    pub fn public_view(&self, issuer: Option<IssuerSummary>) -> PublicCredential {
        PublicCredential {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            credential_type: self.credential_type.clone(),
            category: self.category.clone(),
            issued_date: self.issued_date,
            expiry_date: self.expiry_date,
            status: self.status,
            trust_level: self.trust_level,
            issuer,
        }
    }
}

/// An organization that issues credentials. Issuer identity never changes a
/// credential's content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialIssuer {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CredentialIssuer {
    pub fn summary(&self) -> IssuerSummary {
        IssuerSummary {
            name: self.name.clone(),
            logo_url: self.logo_url.clone(),
            website_url: self.website_url.clone(),
        }
    }
}

/// Issuer fields safe to show on the public verification page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuerSummary {
    pub name: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}

/// The credential field subset rendered to anonymous verifiers. Holder
/// identity, visibility, storage paths, and counters stay private.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicCredential {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub credential_type: Option<String>,
    pub category: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: CredentialStatus,
    pub trust_level: TrustLevel,
    pub issuer: Option<IssuerSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Credential {
        Credential {
            id: Uuid::new_v4(),
            holder_id: Uuid::new_v4(),
            issuer_id: None,
            title: "Welding Level 2".to_string(),
            description: None,
            credential_type: Some("certificate".to_string()),
            category: None,
            issued_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            expiry_date: None,
            status: CredentialStatus::Active,
            trust_level: TrustLevel::SelfAsserted,
            visibility: Visibility::LinkOnly,
            qr_token: QrToken::generate(),
            content_hash: ContentDigest::digest(b"sample"),
            storage_path: "holder/sample.pdf".to_string(),
            verification_count: 0,
            last_verified_at: None,
            revoked_at: None,
            revoked_by: None,
            revoked_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expiry_check() {
        let mut credential = sample();
        assert!(!credential.is_expired());

        credential.expiry_date = Some((Utc::now() - Duration::days(1)).date_naive());
        assert!(credential.is_expired());

        // Expiring today is not yet expired
        credential.expiry_date = Some(Utc::now().date_naive());
        assert!(!credential.is_expired());
    }

    #[test]
    fn test_trust_level_ranks_are_ordered() {
        assert!(TrustLevel::SelfAsserted.rank() < TrustLevel::AiChecked.rank());
        assert!(TrustLevel::AiChecked.rank() < TrustLevel::Reviewed.rank());
        assert!(TrustLevel::Reviewed.rank() < TrustLevel::IssuerSigned.rank());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            CredentialStatus::Active,
            CredentialStatus::Expired,
            CredentialStatus::Revoked,
            CredentialStatus::Suspended,
        ] {
            assert_eq!(CredentialStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CredentialStatus::parse("deleted"), None);
    }

    #[test]
    fn test_private_is_not_publicly_resolvable() {
        assert!(Visibility::Public.publicly_resolvable());
        assert!(Visibility::LinkOnly.publicly_resolvable());
        assert!(!Visibility::Private.publicly_resolvable());
    }

    #[test]
    fn test_qr_tokens_are_unique_and_fixed_width() {
        let a = QrToken::generate();
        let b = QrToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_public_view_hides_private_fields() {
        let credential = sample();
        let view = credential.public_view(None);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("qr_token").is_none());
        assert!(json.get("storage_path").is_none());
        assert!(json.get("holder_id").is_none());
        assert!(json.get("visibility").is_none());
        assert_eq!(json["title"], "Welding Level 2");
    }
}
