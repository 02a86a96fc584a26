//! Revocation ledger entries
//!
//! Append-only: the credential's `status` column is the derived current
//! state, these rows are the history of who changed it and why.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Who performed a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Holder,
    Issuer,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Issuer => "issuer",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "holder" => Some(Self::Holder),
            "issuer" => Some(Self::Issuer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the revocation ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationEvent {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub actor: Uuid,
    pub actor_role: ActorRole,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_role_round_trip() {
        for role in [ActorRole::Holder, ActorRole::Issuer, ActorRole::Admin] {
            assert_eq!(ActorRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(ActorRole::parse("root"), None);
    }
}
