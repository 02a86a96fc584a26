//! Blockchain anchor rows

use chrono::{NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cachet_core::{AnchorStatus, BlockchainAnchor, ChainName, Network};

use crate::error::{insert_error, StorageError};

const COLUMNS: &str = "id, credential_id, chain_name, network, registry_address, \
     transaction_hash, block_number, status, confirmed_at, confirmation_count, gas_used, \
     error, created_at";

/// Store for anchor bookkeeping rows
#[derive(Debug, Clone)]
pub struct AnchorStore {
    pool: SqlitePool,
}

impl AnchorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a pending placeholder row.
    ///
    /// The partial unique index on (credential_id, chain_name, network)
    /// turns a concurrent double-anchor into `AlreadyExists`; the caller
    /// re-reads the surviving row and carries on.
    pub async fn insert_pending(&self, anchor: &BlockchainAnchor) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO blockchain_anchors (
                id, credential_id, chain_name, network, registry_address,
                transaction_hash, block_number, status, confirmed_at,
                confirmation_count, gas_used, error, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(anchor.id.to_string())
        .bind(anchor.credential_id.to_string())
        .bind(anchor.chain_name.as_str())
        .bind(anchor.network.as_str())
        .bind(&anchor.registry_address)
        .bind(&anchor.transaction_hash)
        .bind(anchor.block_number)
        .bind(anchor.status.as_str())
        .bind(anchor.confirmed_at)
        .bind(anchor.confirmation_count)
        .bind(&anchor.gas_used)
        .bind(&anchor.error)
        .bind(anchor.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "anchor"))?;

        Ok(())
    }

    /// The live (pending or confirmed) anchor for a credential on one
    /// (chain, network), if any
    pub async fn find_active(
        &self,
        credential_id: Uuid,
        chain: ChainName,
        network: Network,
    ) -> Result<Option<BlockchainAnchor>, StorageError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM blockchain_anchors \
             WHERE credential_id = ? AND chain_name = ? AND network = ? AND status != 'failed'"
        );
        let row = sqlx::query(&sql)
            .bind(credential_id.to_string())
            .bind(chain.as_str())
            .bind(network.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.map(|r| map_anchor(&r)).transpose()
    }

    pub async fn find_by_credential(
        &self,
        credential_id: Uuid,
    ) -> Result<Vec<BlockchainAnchor>, StorageError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM blockchain_anchors \
             WHERE credential_id = ? ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(credential_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(map_anchor).collect()
    }

    /// Record the transaction hash the moment submission returns, before any
    /// confirmation wait, so a crash cannot orphan the transaction.
    pub async fn set_transaction_hash(
        &self,
        id: Uuid,
        tx_hash: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE blockchain_anchors SET transaction_hash = ? WHERE id = ?")
            .bind(tx_hash)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    pub async fn mark_confirmed(
        &self,
        id: Uuid,
        block_number: i64,
        confirmation_count: i64,
        gas_used: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE blockchain_anchors
            SET status = 'confirmed', block_number = ?, confirmed_at = ?,
                confirmation_count = ?, gas_used = ?
            WHERE id = ?
            "#,
        )
        .bind(block_number)
        .bind(Utc::now())
        .bind(confirmation_count)
        .bind(gas_used)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE blockchain_anchors SET status = 'failed', error = ? WHERE id = ?")
            .bind(error)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    /// Remove a placeholder that never reached the chain (no endpoint was
    /// reachable), so the next attempt starts clean.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM blockchain_anchors WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_anchor(row: &sqlx::sqlite::SqliteRow) -> Result<BlockchainAnchor, StorageError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let id = Uuid::parse_str(&id_str).map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let credential_str: String = row
        .try_get("credential_id")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let credential_id = Uuid::parse_str(&credential_str)
        .map_err(|_| StorageError::Query("Invalid UUID".into()))?;

    let chain_str: String = row
        .try_get("chain_name")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let chain_name = ChainName::parse(&chain_str)
        .ok_or_else(|| StorageError::Query("Invalid chain name in DB".into()))?;

    let network_str: String = row
        .try_get("network")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let network = Network::parse(&network_str)
        .ok_or_else(|| StorageError::Query("Invalid network in DB".into()))?;

    let status_str: String = row
        .try_get("status")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let status = AnchorStatus::parse(&status_str)
        .ok_or_else(|| StorageError::Query("Invalid anchor status in DB".into()))?;

    let confirmed_at: Option<NaiveDateTime> = row
        .try_get("confirmed_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let created_at: NaiveDateTime = row
        .try_get("created_at")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    Ok(BlockchainAnchor {
        id,
        credential_id,
        chain_name,
        network,
        registry_address: row
            .try_get("registry_address")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        transaction_hash: row
            .try_get("transaction_hash")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        block_number: row
            .try_get("block_number")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        status,
        confirmed_at: confirmed_at.map(|n| n.and_utc()),
        confirmation_count: row
            .try_get("confirmation_count")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        gas_used: row
            .try_get("gas_used")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        error: row
            .try_get("error")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        created_at: created_at.and_utc(),
    })
}
