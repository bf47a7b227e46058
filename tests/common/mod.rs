//! Shared utilities for integration testing: a mock Blockfrost backend and
//! a minter wired against it.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use cip68_minter::blockchain::{cbor, hash, KeyWalletExtension, Network, WalletRegistry};
use cip68_minter::config::MinterConfig;
use cip68_minter::{HttpServer, Minter, Shutdown};

/// RFC 8032 test vector 1 secret key.
pub const TEST_SIGNING_KEY: &str =
    "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
pub const PROJECT_ID: &str = "preprodTESTPROJECT";
pub const ALWAYS_SUCCEEDS: &str = "480100002221200101";

/// Observable state of the mock backend.
#[derive(Default)]
pub struct MockChain {
    pub parameter_calls: AtomicUsize,
    pub evaluations: AtomicUsize,
    pub submitted: Mutex<Vec<Vec<u8>>>,
    pub reject_submit: AtomicBool,
    /// UTxOs as `(lovelace)` entries; all belong to whatever address is asked.
    pub utxos: Mutex<Vec<u64>>,
}

impl MockChain {
    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("project_id").and_then(|v| v.to_str().ok()) == Some(PROJECT_ID)
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "status_code": 403,
            "error": "Forbidden",
            "message": "Invalid project token."
        })),
    )
        .into_response()
}

async fn parameters(State(chain): State<Arc<MockChain>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return forbidden();
    }
    chain.parameter_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "min_fee_a": 44,
        "min_fee_b": 155381,
        "max_tx_size": 16384,
        "coins_per_utxo_size": "4310",
        "price_mem": 0.0577,
        "price_step": 0.0000721,
        "collateral_percent": 150,
        "max_tx_ex_mem": "14000000",
        "max_tx_ex_steps": "10000000000",
        "cost_models_raw": {
            "PlutusV1": [205665, 812, 1, 1],
            "PlutusV2": [205665, 812, 1, 1, 1000],
            "PlutusV3": [100788, 420, 1, 1, 1000, 173]
        }
    }))
    .into_response()
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

async fn utxos(
    State(chain): State<Arc<MockChain>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    if !authorized(&headers) {
        return forbidden();
    }
    if query.page.unwrap_or(1) > 1 {
        return Json(json!([])).into_response();
    }
    let entries: Vec<_> = chain
        .utxos
        .lock()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, lovelace)| {
            json!({
                "tx_hash": "11".repeat(32),
                "output_index": i,
                "amount": [{ "unit": "lovelace", "quantity": lovelace.to_string() }]
            })
        })
        .collect();
    if entries.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "status_code": 404, "error": "Not Found", "message": "The requested component has not been found." })),
        )
            .into_response();
    }
    Json(json!(entries)).into_response()
}

async fn evaluate(State(chain): State<Arc<MockChain>>, headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&headers) {
        return forbidden();
    }
    chain.evaluations.fetch_add(1, Ordering::SeqCst);
    // Body is hex text of the transaction.
    if hex::decode(&body).is_err() {
        return (StatusCode::BAD_REQUEST, "not hex").into_response();
    }
    Json(json!({
        "type": "jsonwsp/response",
        "result": { "EvaluationResult": { "mint:0": { "memory": 1700, "steps": 476468 } } }
    }))
    .into_response()
}

async fn submit(State(chain): State<Arc<MockChain>>, headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&headers) {
        return forbidden();
    }
    if chain.reject_submit.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status_code": 400,
                "error": "Bad Request",
                "message": "BadInputsUTxO"
            })),
        )
            .into_response();
    }
    let tx_hash = match body_hash(&body) {
        Some(hash) => hash,
        None => return (StatusCode::BAD_REQUEST, "malformed transaction").into_response(),
    };
    chain.submitted.lock().unwrap().push(body.to_vec());
    Json(json!(tx_hash)).into_response()
}

/// Hash of the first element of the transaction array, as a node computes it.
pub fn body_hash(tx: &[u8]) -> Option<String> {
    let ciborium::Value::Array(mut parts) = cbor::from_slice(tx).ok()? else {
        return None;
    };
    if parts.len() != 4 {
        return None;
    }
    let body = cbor::to_vec(&parts.remove(0)).ok()?;
    Some(hex::encode(hash::blake2b_256(&[&body[..]])))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "is_healthy": true }))
}

/// Start the mock Blockfrost backend on an ephemeral port.
pub async fn start_mock_blockfrost(chain: Arc<MockChain>) -> SocketAddr {
    let app = Router::new()
        .route("/epochs/latest/parameters", get(parameters))
        .route("/addresses/{address}/utxos", get(utxos))
        .route("/utils/txs/evaluate", post(evaluate))
        .route("/tx/submit", post(submit))
        .route("/health", get(health))
        .with_state(chain);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Minter config pointing at `provider`.
pub fn minter_config(provider: SocketAddr, project_id: &str) -> MinterConfig {
    let mut config = MinterConfig::default();
    config.chain.network = Network::Preprod;
    config.chain.provider_url = Some(format!("http://{}", provider));
    config.chain.project_id = project_id.to_string();
    config.chain.request_timeout_secs = 5;
    config.policy.script_type = cip68_minter::blockchain::ScriptType::PlutusV2;
    config.policy.script = ALWAYS_SUCCEEDS.to_string();
    config
}

pub fn registry(network: Network) -> WalletRegistry {
    let mut registry = WalletRegistry::new();
    registry.register(
        "local",
        Arc::new(KeyWalletExtension::from_key_hex("local", network, TEST_SIGNING_KEY)),
    );
    registry
}

/// A running minter HTTP server.
pub struct TestServer {
    pub addr: SocketAddr,
    pub minter: Arc<Minter>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_minter(config: MinterConfig) -> TestServer {
    let minter = Arc::new(Minter::new(&config, registry(config.chain.network)).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(minter.clone(), Duration::from_secs(30));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        minter,
        shutdown,
    }
}
