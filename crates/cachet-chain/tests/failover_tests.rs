//! Failover behavior against local stub RPC servers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use cachet_chain::{ChainClient, ChainError, ChainSettings, EvmRegistry, RegistryBackend};
use cachet_core::{ChainName, Network};
use serde_json::{json, Value};

const REGISTRY: &str = "0x1111111111111111111111111111111111111111";

fn word(hex_value: &str) -> String {
    format!("{hex_value:0>64}")
}

fn rpc_result(id: Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn rpc_error(id: Value, message: &str) -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": 3, "message": message }
    }))
}

/// Answers every method the client uses
async fn healthy_handler(Json(req): Json<Value>) -> Json<Value> {
    let id = req.get("id").cloned().unwrap_or(json!(1));
    match req.get("method").and_then(|m| m.as_str()) {
        Some("eth_blockNumber") => rpc_result(id, json!("0x10")),
        Some("eth_chainId") => rpc_result(id, json!("0x13881")),
        Some("eth_call") => {
            let ret = format!("0x{}{}{}", word("1"), word("0"), word("1"));
            rpc_result(id, json!(ret))
        }
        Some("eth_sendTransaction") => rpc_result(id, json!(format!("0x{}", "ab".repeat(32)))),
        Some("eth_getTransactionReceipt") => rpc_result(id, Value::Null),
        _ => rpc_error(id, "method not found"),
    }
}

/// Answers the liveness probe but rejects everything that executes contract
/// code, counting submission attempts.
async fn reverting_handler(
    State(submissions): State<Arc<AtomicUsize>>,
    Json(req): Json<Value>,
) -> Json<Value> {
    let id = req.get("id").cloned().unwrap_or(json!(1));
    match req.get("method").and_then(|m| m.as_str()) {
        Some("eth_blockNumber") => rpc_result(id, json!("0x10")),
        Some("eth_sendTransaction") => {
            submissions.fetch_add(1, Ordering::SeqCst);
            rpc_error(id, "execution reverted: unknown credential")
        }
        _ => rpc_error(id, "execution reverted: unknown credential"),
    }
}

/// Reachable over TCP but fails the liveness probe
async fn rate_limited_handler(Json(req): Json<Value>) -> Json<Value> {
    let id = req.get("id").cloned().unwrap_or(json!(1));
    rpc_error(id, "rate limit exceeded")
}

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn healthy_stub() -> String {
    spawn_stub(Router::new().route("/", post(healthy_handler))).await
}

fn settings(endpoints: Vec<String>) -> ChainSettings {
    ChainSettings::new(ChainName::Polygon, Network::Testnet)
        .with_endpoints(endpoints)
        .with_probe_timeout(Duration::from_millis(500))
        .with_request_timeout(Duration::from_secs(2))
}

// Port 9 (discard) refuses connections immediately.
const REFUSED: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn test_connect_prefers_earlier_live_endpoint() {
    let first = healthy_stub().await;
    let second = healthy_stub().await;

    let client = ChainClient::new(settings(vec![first.clone(), second])).unwrap();
    let conn = client.connect().await.unwrap();

    assert_eq!(conn.endpoint(), first);
}

#[tokio::test]
async fn test_connect_skips_refused_endpoint() {
    let live = healthy_stub().await;

    let client = ChainClient::new(settings(vec![REFUSED.to_string(), live.clone()])).unwrap();
    let conn = client.connect().await.unwrap();

    assert_eq!(conn.endpoint(), live);
    assert_eq!(conn.block_number().await.unwrap(), 16);
    assert_eq!(conn.chain_id().await.unwrap(), 80001);
}

#[tokio::test]
async fn test_connect_skips_endpoint_failing_the_probe() {
    let limited = spawn_stub(Router::new().route("/", post(rate_limited_handler))).await;
    let live = healthy_stub().await;

    let client = ChainClient::new(settings(vec![limited, live.clone()])).unwrap();
    let conn = client.connect().await.unwrap();

    assert_eq!(conn.endpoint(), live);
}

#[tokio::test]
async fn test_connect_reports_exhaustion() {
    let client = ChainClient::new(settings(vec![
        REFUSED.to_string(),
        REFUSED.to_string(),
    ]))
    .unwrap();

    match client.connect().await {
        Err(ChainError::NoReachableEndpoint {
            attempted,
            last_error,
        }) => {
            assert_eq!(attempted, 2);
            assert!(!last_error.is_empty());
        }
        other => panic!("expected NoReachableEndpoint, got {other:?}"),
    }
}

#[tokio::test]
async fn test_call_revert_maps_to_contract_revert() {
    let submissions = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/", post(reverting_handler))
        .with_state(submissions);
    let url = spawn_stub(router).await;

    let client = ChainClient::new(settings(vec![url])).unwrap();
    let conn = client.connect().await.unwrap();

    match conn.call(REGISTRY, "0xdeadbeef").await {
        Err(ChainError::ContractRevert(msg)) => assert!(msg.contains("execution reverted")),
        other => panic!("expected ContractRevert, got {other:?}"),
    }
}

#[tokio::test]
async fn test_revert_is_not_retried() {
    let submissions = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/", post(reverting_handler))
        .with_state(submissions.clone());
    let url = spawn_stub(router).await;

    let registry = EvmRegistry::new(
        settings(vec![url]).with_signer("0x2222222222222222222222222222222222222222"),
    )
    .unwrap();

    let result = registry.issue(REGISTRY, [0u8; 32], [1u8; 32]).await;
    assert!(matches!(result, Err(ChainError::ContractRevert(_))));
    assert_eq!(submissions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_registry_round_trip_against_stub() {
    let url = healthy_stub().await;
    let registry = EvmRegistry::new(
        settings(vec![url]).with_signer("0x2222222222222222222222222222222222222222"),
    )
    .unwrap();

    let tx_hash = registry.issue(REGISTRY, [3u8; 32], [4u8; 32]).await.unwrap();
    assert_eq!(tx_hash, format!("0x{}", "ab".repeat(32)));

    let entry = registry.entry(REGISTRY, [3u8; 32], [4u8; 32]).await.unwrap();
    assert!(entry.exists);
    assert!(!entry.revoked);
    assert!(entry.digest_matches);

    // Stub never mines anything, so the receipt stays pending.
    assert!(registry.receipt(&tx_hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_writes_require_a_signer() {
    let url = healthy_stub().await;
    let registry = EvmRegistry::new(settings(vec![url])).unwrap();

    assert!(!registry.can_write());
    let result = registry.issue(REGISTRY, [0u8; 32], [0u8; 32]).await;
    assert!(matches!(result, Err(ChainError::NotConfigured(_))));
}
