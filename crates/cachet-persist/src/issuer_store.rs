//! Credential issuer rows

use chrono::NaiveDateTime;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cachet_core::CredentialIssuer;

use crate::error::{insert_error, StorageError};

/// Store for issuing organizations
#[derive(Debug, Clone)]
pub struct IssuerStore {
    pool: SqlitePool,
}

impl IssuerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, issuer: &CredentialIssuer) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO credential_issuers (id, name, logo_url, website_url, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(issuer.id.to_string())
        .bind(&issuer.name)
        .bind(&issuer.logo_url)
        .bind(&issuer.website_url)
        .bind(issuer.is_active)
        .bind(issuer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "issuer"))?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialIssuer>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, logo_url, website_url, is_active, created_at \
             FROM credential_issuers WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        row.map(|r| map_issuer(&r)).transpose()
    }
}

fn map_issuer(row: &sqlx::sqlite::SqliteRow) -> Result<CredentialIssuer, StorageError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let id = Uuid::parse_str(&id_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let created_at: NaiveDateTime = row
        .try_get("created_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    Ok(CredentialIssuer {
        id,
        name: row
            .try_get("name")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        logo_url: row
            .try_get("logo_url")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        website_url: row
            .try_get("website_url")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        is_active: row.try_get("is_active").unwrap_or(true),
        created_at: created_at.and_utc(),
    })
}
