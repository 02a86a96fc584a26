//! Revocation ledger rows (append-only)

use chrono::NaiveDateTime;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cachet_core::{ActorRole, RevocationEvent};

use crate::error::{insert_error, StorageError};

/// Store for the revocation ledger
#[derive(Debug, Clone)]
pub struct RevocationStore {
    pool: SqlitePool,
}

impl RevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, event: &RevocationEvent) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO revocation_events (id, credential_id, actor, actor_role, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.credential_id.to_string())
        .bind(event.actor.to_string())
        .bind(event.actor_role.as_str())
        .bind(&event.reason)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "revocation event"))?;

        Ok(())
    }

    /// Full history for one credential, oldest first
    pub async fn list(&self, credential_id: Uuid) -> Result<Vec<RevocationEvent>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, credential_id, actor, actor_role, reason, created_at
            FROM revocation_events
            WHERE credential_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(credential_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(map_event).collect()
    }
}

fn map_event(row: &sqlx::sqlite::SqliteRow) -> Result<RevocationEvent, StorageError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let id = Uuid::parse_str(&id_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let credential_str: String = row
        .try_get("credential_id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let credential_id = Uuid::parse_str(&credential_str)
        .map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let actor_str: String = row
        .try_get("actor")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let actor =
        Uuid::parse_str(&actor_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let role_str: String = row
        .try_get("actor_role")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let actor_role = ActorRole::parse(&role_str)
        .ok_or_else(|| StorageError::Query("Invalid actor role in DB".into()))?;

    let created_at: NaiveDateTime = row
        .try_get("created_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    Ok(RevocationEvent {
        id,
        credential_id,
        actor,
        actor_role,
        reason: row
            .try_get("reason")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        created_at: created_at.and_utc(),
    })
}
