//! Multi-endpoint JSON-RPC client
//!
//! Produces a live connection for a (chain, network) pair despite any single
//! RPC provider being down, rate-limited, or slow. Candidates are probed
//! strictly in order, one at a time, each under its own timeout; the first
//! endpoint that answers a block-height query becomes the working endpoint
//! for the remainder of the operation.

use crate::error::ChainError;
use crate::settings::ChainSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'a str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Receipt fields the anchor writer cares about
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub block_number: u64,
    /// Decimal string; chains can exceed what fits in an i64
    pub gas_used: Option<String>,
    /// status 0x1. A missing status field counts as failed.
    pub succeeded: bool,
}

impl TxReceipt {
    fn from_value(value: &serde_json::Value) -> Result<Self, ChainError> {
        let block_number = value
            .get("blockNumber")
            .and_then(|b| b.as_str())
            .ok_or_else(|| {
                ChainError::InvalidResponse("receipt missing blockNumber".to_string())
            })
            .and_then(parse_hex_u64)?;

        let gas_used = value
            .get("gasUsed")
            .and_then(|g| g.as_str())
            .and_then(|s| parse_hex_u128(s).ok())
            .map(|g| g.to_string());

        let succeeded = value
            .get("status")
            .and_then(|s| s.as_str())
            .map(|s| s == "0x1")
            .unwrap_or(false);

        Ok(Self {
            block_number,
            gas_used,
            succeeded,
        })
    }
}

/// The fault-tolerant connector. Holds the candidate list and a shared HTTP
/// client; `connect` yields a [`ChainConnection`] bound to one live endpoint.
#[derive(Debug, Clone)]
pub struct ChainClient {
    settings: ChainSettings,
    http: reqwest::Client,
}

impl ChainClient {
    pub fn new(settings: ChainSettings) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("cachet-chain/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    /// Probe candidates in order and return a connection to the first one
    /// that answers a block-height query within the probe timeout.
    ///
    /// Probes run sequentially, never fanned out, so a wall of fallbacks is
    /// not hammered simultaneously; each probe has an independent timeout so
    /// one slow endpoint cannot stall the rest of the list.
    pub async fn connect(&self) -> Result<ChainConnection, ChainError> {
        let mut last_error = "no endpoints configured".to_string();

        for endpoint in &self.settings.endpoints {
            let candidate = ChainConnection {
                http: self.http.clone(),
                endpoint: endpoint.clone(),
            };

            match tokio::time::timeout(self.settings.probe_timeout, candidate.block_number())
                .await
            {
                Ok(Ok(block)) => {
                    tracing::info!(
                        chain = %self.settings.chain,
                        network = %self.settings.network,
                        endpoint = %endpoint,
                        block,
                        "selected working RPC endpoint"
                    );
                    return Ok(candidate);
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    tracing::warn!(endpoint = %endpoint, error = %last_error, "endpoint probe failed");
                }
                Err(_) => {
                    last_error = format!(
                        "probe timed out after {}s",
                        self.settings.probe_timeout.as_secs()
                    );
                    tracing::warn!(endpoint = %endpoint, error = %last_error, "endpoint probe failed");
                }
            }
        }

        Err(ChainError::NoReachableEndpoint {
            attempted: self.settings.endpoints.len(),
            last_error,
        })
    }
}

/// A connection pinned to one working endpoint
#[derive(Debug, Clone)]
pub struct ChainConnection {
    http: reqwest::Client,
    endpoint: String,
}

impl ChainConnection {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current block height
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let hex: String = self.rpc("eth_blockNumber", serde_json::json!([])).await?;
        parse_hex_u64(&hex)
    }

    /// The chain id the endpoint claims to serve
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let hex: String = self.rpc("eth_chainId", serde_json::json!([])).await?;
        parse_hex_u64(&hex)
    }

    /// Contract view-function call; returns the raw hex result
    pub async fn call(&self, to: &str, data: &str) -> Result<String, ChainError> {
        self.rpc_contract(
            "eth_call",
            serde_json::json!([{ "to": to, "data": data }, "latest"]),
        )
        .await
    }

    /// Submit a transaction. Signing is the RPC provider's job: the `from`
    /// account's key is held by the node's key management, never by us.
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &str,
    ) -> Result<String, ChainError> {
        self.rpc_contract(
            "eth_sendTransaction",
            serde_json::json!([{ "from": from, "to": to, "data": data }]),
        )
        .await
    }

    /// Fetch the receipt for a submitted transaction; `None` while pending
    pub async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TxReceipt>, ChainError> {
        let value: serde_json::Value = self
            .rpc_nullable("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await?;

        if value.is_null() {
            return Ok(None);
        }
        TxReceipt::from_value(&value).map(Some)
    }

    /// Plain RPC: a missing or null result is a malformed response
    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let resp: JsonRpcResponse<T> = self.post(method, params).await?;
        if let Some(err) = resp.error {
            return Err(ChainError::Transport(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }
        resp.result
            .ok_or_else(|| ChainError::InvalidResponse("missing result field".to_string()))
    }

    /// RPC where null is a meaningful result (pending receipts)
    async fn rpc_nullable(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        let resp: JsonRpcResponse<serde_json::Value> = self.post(method, params).await?;
        if let Some(err) = resp.error {
            return Err(ChainError::Transport(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }
        Ok(resp.result.unwrap_or(serde_json::Value::Null))
    }

    /// RPC for methods that execute contract code: an RPC-level error here
    /// is a revert, not a transport problem, and must not be retried.
    async fn rpc_contract(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<String, ChainError> {
        let resp: JsonRpcResponse<String> = self.post(method, params).await?;
        if let Some(err) = resp.error {
            return Err(ChainError::ContractRevert(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }
        resp.result
            .ok_or_else(|| ChainError::InvalidResponse("missing result field".to_string()))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<JsonRpcResponse<T>, ChainError> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChainError::Transport(format!(
                "HTTP {} from {}",
                resp.status(),
                self.endpoint
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }
}

fn parse_hex_u64(hex: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad hex quantity {hex:?}: {e}")))
}

fn parse_hex_u128(hex: &str) -> Result<u128, ChainError> {
    u128::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad hex quantity {hex:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_quantities() {
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert_eq!(parse_hex_u64("2a").unwrap(), 42);
        assert!(parse_hex_u64("0xzz").is_err());
        assert!(parse_hex_u64("").is_err());
    }

    #[test]
    fn test_receipt_from_value() {
        let value = serde_json::json!({
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "status": "0x1"
        });
        let receipt = TxReceipt::from_value(&value).unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used.as_deref(), Some("21000"));
        assert!(receipt.succeeded);
    }

    #[test]
    fn test_reverted_receipt() {
        let value = serde_json::json!({
            "blockNumber": "0xff",
            "status": "0x0"
        });
        let receipt = TxReceipt::from_value(&value).unwrap();
        assert!(!receipt.succeeded);
        assert_eq!(receipt.gas_used, None);
    }

    #[test]
    fn test_receipt_missing_status_counts_as_failed() {
        let value = serde_json::json!({ "blockNumber": "0x1" });
        assert!(!TxReceipt::from_value(&value).unwrap().succeeded);
    }

    #[test]
    fn test_receipt_requires_block_number() {
        let value = serde_json::json!({ "status": "0x1" });
        assert!(TxReceipt::from_value(&value).is_err());
    }
}
