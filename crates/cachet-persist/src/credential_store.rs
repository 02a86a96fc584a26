//! Credential rows

use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cachet_core::{
    ContentDigest, Credential, CredentialStatus, QrToken, TrustLevel, Visibility,
};

use crate::error::{insert_error, StorageError};

const COLUMNS: &str = "id, holder_id, issuer_id, title, description, credential_type, category, \
     issued_date, expiry_date, status, trust_level, visibility, qr_token, content_hash, \
     storage_path, verification_count, last_verified_at, revoked_at, revoked_by, \
     revoked_reason, created_at";

/// Store for credential records
#[derive(Debug, Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, credential: &Credential) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO credentials (
                id, holder_id, issuer_id, title, description, credential_type, category,
                issued_date, expiry_date, status, trust_level, visibility, qr_token,
                content_hash, storage_path, verification_count, last_verified_at,
                revoked_at, revoked_by, revoked_reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(credential.id.to_string())
        .bind(credential.holder_id.to_string())
        .bind(credential.issuer_id.map(|u| u.to_string()))
        .bind(&credential.title)
        .bind(&credential.description)
        .bind(&credential.credential_type)
        .bind(&credential.category)
        .bind(credential.issued_date)
        .bind(credential.expiry_date)
        .bind(credential.status.as_str())
        .bind(credential.trust_level.as_str())
        .bind(credential.visibility.as_str())
        .bind(credential.qr_token.as_str())
        .bind(credential.content_hash.to_hex())
        .bind(&credential.storage_path)
        .bind(credential.verification_count)
        .bind(credential.last_verified_at)
        .bind(credential.revoked_at)
        .bind(credential.revoked_by.map(|u| u.to_string()))
        .bind(&credential.revoked_reason)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "credential"))?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, StorageError> {
        let sql = format!("SELECT {COLUMNS} FROM credentials WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.map(|r| map_credential(&r)).transpose()
    }

    pub async fn find_by_qr_token(&self, token: &str) -> Result<Option<Credential>, StorageError> {
        let sql = format!("SELECT {COLUMNS} FROM credentials WHERE qr_token = ?");
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.map(|r| map_credential(&r)).transpose()
    }

    pub async fn list_by_holder(&self, holder_id: Uuid) -> Result<Vec<Credential>, StorageError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM credentials WHERE holder_id = ? ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(holder_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(map_credential).collect()
    }

    /// Flip a credential to revoked. Keeps the first revocation's metadata
    /// if called again, so repeated revocations stay idempotent.
    pub async fn mark_revoked(
        &self,
        id: Uuid,
        revoked_by: Uuid,
        reason: Option<&str>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE credentials
            SET status = 'revoked',
                revoked_at = COALESCE(revoked_at, ?),
                revoked_by = COALESCE(revoked_by, ?),
                revoked_reason = COALESCE(revoked_reason, ?)
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(revoked_by.to_string())
        .bind(reason)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump the verification counter and timestamp
    pub async fn record_verification(&self, id: Uuid) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET verification_count = verification_count + 1, last_verified_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    pub async fn set_trust_level(&self, id: Uuid, level: TrustLevel) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE credentials SET trust_level = ? WHERE id = ?")
            .bind(level.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_credential(row: &sqlx::sqlite::SqliteRow) -> Result<Credential, StorageError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let id = Uuid::parse_str(&id_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let holder_str: String = row
        .try_get("holder_id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let holder_id =
        Uuid::parse_str(&holder_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let issuer_str: Option<String> = row
        .try_get("issuer_id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let issuer_id = issuer_str
        .map(|s| Uuid::parse_str(&s).map_err(|_| StorageError::Query("Invalid UUID".into())))
        .transpose()?;

    let status_str: String = row
        .try_get("status")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let status = CredentialStatus::parse(&status_str)
        .ok_or_else(|| StorageError::Query("Invalid status in DB".into()))?;

    let trust_str: String = row
        .try_get("trust_level")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let trust_level = TrustLevel::parse(&trust_str)
        .ok_or_else(|| StorageError::Query("Invalid trust level in DB".into()))?;

    let visibility_str: String = row
        .try_get("visibility")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let visibility = Visibility::parse(&visibility_str)
        .ok_or_else(|| StorageError::Query("Invalid visibility in DB".into()))?;

    let qr_token: String = row
        .try_get("qr_token")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    let hash_str: String = row
        .try_get("content_hash")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let content_hash = ContentDigest::from_hex(&hash_str)
        .map_err(|_| StorageError::Query("Invalid content hash in DB".into()))?;

    let issued_date: Option<NaiveDate> = row
        .try_get("issued_date")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let expiry_date: Option<NaiveDate> = row
        .try_get("expiry_date")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    let last_verified: Option<NaiveDateTime> = row
        .try_get("last_verified_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let revoked_at: Option<NaiveDateTime> = row
        .try_get("revoked_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let created_at: NaiveDateTime = row
        .try_get("created_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    let revoked_by_str: Option<String> = row
        .try_get("revoked_by")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let revoked_by = revoked_by_str
        .map(|s| Uuid::parse_str(&s).map_err(|_| StorageError::Query("Invalid UUID".into())))
        .transpose()?;

    Ok(Credential {
        id,
        holder_id,
        issuer_id,
        title: row
            .try_get("title")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        description: row
            .try_get("description")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        credential_type: row
            .try_get("credential_type")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        category: row
            .try_get("category")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        issued_date,
        expiry_date,
        status,
        trust_level,
        visibility,
        qr_token: QrToken::from_string(qr_token),
        content_hash,
        storage_path: row
            .try_get("storage_path")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        verification_count: row.try_get("verification_count").unwrap_or(0),
        last_verified_at: last_verified.map(|n| n.and_utc()),
        revoked_at: revoked_at.map(|n| n.and_utc()),
        revoked_by,
        revoked_reason: row
            .try_get("revoked_reason")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        created_at: created_at.and_utc(),
    })
}
