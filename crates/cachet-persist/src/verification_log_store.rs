//! Verification log rows (append-only)

use chrono::NaiveDateTime;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cachet_core::{VerificationLog, VerificationOutcome};

use crate::error::{insert_error, StorageError};

/// Store for the verification audit log
#[derive(Debug, Clone)]
pub struct VerificationLogStore {
    pool: SqlitePool,
}

impl VerificationLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, log: &VerificationLog) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO verification_logs (
                id, credential_id, qr_token, result, hash_match, blockchain_verified,
                ip_address, user_agent, referrer, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.id.to_string())
        .bind(log.credential_id.to_string())
        .bind(&log.qr_token)
        .bind(log.result.as_str())
        .bind(log.hash_match)
        .bind(log.blockchain_verified)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(&log.referrer)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "verification log"))?;

        Ok(())
    }

    /// Most recent log rows for one credential
    pub async fn recent(
        &self,
        credential_id: Uuid,
        limit: i64,
    ) -> Result<Vec<VerificationLog>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, credential_id, qr_token, result, hash_match, blockchain_verified,
                   ip_address, user_agent, referrer, created_at
            FROM verification_logs
            WHERE credential_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(credential_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(map_log).collect()
    }
}

fn map_log(row: &sqlx::sqlite::SqliteRow) -> Result<VerificationLog, StorageError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let id = Uuid::parse_str(&id_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let credential_str: String = row
        .try_get("credential_id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let credential_id = Uuid::parse_str(&credential_str)
        .map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let result_str: String = row
        .try_get("result")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let result = VerificationOutcome::parse(&result_str)
        .ok_or_else(|| StorageError::Query("Invalid verification result in DB".into()))?;

    let created_at: NaiveDateTime = row
        .try_get("created_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    Ok(VerificationLog {
        id,
        credential_id,
        qr_token: row
            .try_get("qr_token")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        result,
        hash_match: row.try_get("hash_match").unwrap_or(false),
        blockchain_verified: row.try_get("blockchain_verified").unwrap_or(false),
        ip_address: row
            .try_get("ip_address")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        user_agent: row
            .try_get("user_agent")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        referrer: row
            .try_get("referrer")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        created_at: created_at.and_utc(),
    })
}
