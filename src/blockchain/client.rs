//! Blockfrost chain provider with timeout and error handling.
//!
//! # Responsibilities
//! - Authenticate against the provider with the project id
//! - Query protocol parameters and address UTxOs
//! - Evaluate script budgets and submit signed transactions
//! - Fail over between endpoints for read calls; submit goes to the primary only

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::blockchain::address::Address;
use crate::blockchain::policy::ScriptType;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainConfig, ExUnits, PolicyId, ProtocolParameters, TxHash,
};
use crate::blockchain::value::{TxInput, Utxo, Value};
use crate::observability::metrics;

/// Header carrying the Blockfrost project id.
pub const PROJECT_ID_HEADER: &str = "project_id";

const UTXO_PAGE_SIZE: usize = 100;

/// Execution budget reported for one redeemer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemerBudget {
    /// Redeemer purpose as reported by the evaluator (`spend`, `mint`, ...).
    pub purpose: String,
    pub index: u64,
    pub ex_units: ExUnits,
}

/// Chain data and submission backend used by the minting pipeline.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn protocol_parameters(&self) -> BlockchainResult<ProtocolParameters>;

    async fn utxos_at(&self, address: &Address) -> BlockchainResult<Vec<Utxo>>;

    /// Evaluate script budgets for an unsigned transaction.
    async fn evaluate_tx(&self, tx_cbor: &[u8]) -> BlockchainResult<Vec<RedeemerBudget>>;

    async fn submit_tx(&self, tx_cbor: &[u8]) -> BlockchainResult<TxHash>;

    async fn is_healthy(&self) -> bool;
}

/// Blockfrost HTTP client.
#[derive(Clone)]
pub struct BlockfrostClient {
    http: reqwest::Client,
    /// Primary endpoint first, failovers after.
    base_urls: Vec<String>,
    project_id: String,
    timeout_secs: u64,
}

impl BlockfrostClient {
    /// Create a client for the configured network.
    ///
    /// No request is made here; the first call performs the handshake.
    pub fn new(config: &ChainConfig) -> BlockchainResult<Self> {
        let primary = config
            .provider_url
            .clone()
            .unwrap_or_else(|| config.network.blockfrost_url().to_string());

        let mut base_urls = Vec::new();
        let parsed: url::Url = primary.parse().map_err(|e| {
            BlockchainError::Config(format!("Invalid provider URL '{}': {}", primary, e))
        })?;
        base_urls.push(parsed.as_str().trim_end_matches('/').to_string());

        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => base_urls.push(url.as_str().trim_end_matches('/').to_string()),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover provider URL"),
            }
        }

        if config.project_id.is_empty() {
            tracing::warn!("Provider project id is empty; requests will likely be rejected");
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BlockchainError::Provider(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_urls,
            project_id: config.project_id.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn primary_url(&self) -> &str {
        &self.base_urls[0]
    }

    fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(PROJECT_ID_HEADER, &self.project_id)
    }

    /// GET a JSON document, trying each endpoint in turn on transport failure.
    /// A 404 maps to `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
    ) -> BlockchainResult<Option<T>> {
        for (i, base) in self.base_urls.iter().enumerate() {
            let started = Instant::now();
            let request = self.authorized(self.http.get(format!("{}{}", base, path)));
            match timeout(self.timeout_duration(), request.send()).await {
                Ok(Ok(response)) => {
                    metrics::record_provider_request(endpoint, response.status().as_u16(), started);
                    if response.status() == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    return self.read_json(response).await.map(Some);
                }
                Ok(Err(e)) => {
                    metrics::record_provider_request(endpoint, 0, started);
                    tracing::warn!(provider_idx = i, path = %path, error = %e, "Provider error, trying next endpoint");
                }
                Err(_) => {
                    metrics::record_provider_request(endpoint, 0, started);
                    tracing::warn!(provider_idx = i, path = %path, "Provider timeout, trying next endpoint");
                }
            }
        }
        Err(BlockchainError::Provider(format!(
            "All provider endpoints failed for {}",
            path
        )))
    }

    /// POST a CBOR body to the primary endpoint.
    async fn post_cbor(
        &self,
        endpoint: &'static str,
        path: &str,
        body: Vec<u8>,
    ) -> BlockchainResult<Response> {
        let started = Instant::now();
        let request = self
            .authorized(self.http.post(format!("{}{}", self.primary_url(), path)))
            .header(CONTENT_TYPE, "application/cbor")
            .body(body);
        let response = timeout(self.timeout_duration(), request.send())
            .await
            .map_err(|_| BlockchainError::Timeout(self.timeout_secs))?
            .map_err(|e| BlockchainError::Provider(format!("{} request failed: {}", path, e)))?;
        metrics::record_provider_request(endpoint, response.status().as_u16(), started);
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> BlockchainResult<T> {
        let status = response.status();
        let body = timeout(self.timeout_duration(), response.text())
            .await
            .map_err(|_| BlockchainError::Timeout(self.timeout_secs))?
            .map_err(|e| BlockchainError::Provider(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| BlockchainError::Provider(format!("Unexpected response shape: {}", e)))
    }
}

#[async_trait]
impl ChainProvider for BlockfrostClient {
    async fn protocol_parameters(&self) -> BlockchainResult<ProtocolParameters> {
        let raw: RawParameters = self
            .get_json("parameters", "/epochs/latest/parameters")
            .await?
            .ok_or_else(|| BlockchainError::Provider("protocol parameters not found".into()))?;
        raw.into_parameters()
    }

    async fn utxos_at(&self, address: &Address) -> BlockchainResult<Vec<Utxo>> {
        let mut utxos = Vec::new();
        for page in 1.. {
            let path = format!(
                "/addresses/{}/utxos?page={}&count={}",
                address, page, UTXO_PAGE_SIZE
            );
            let batch: Vec<RawUtxo> = match self.get_json("utxos", &path).await? {
                Some(batch) => batch,
                // Blockfrost answers 404 for addresses it has never seen.
                None => break,
            };
            let len = batch.len();
            for raw in batch {
                utxos.push(raw.into_utxo()?);
            }
            if len < UTXO_PAGE_SIZE {
                break;
            }
        }
        tracing::debug!(address = %address, count = utxos.len(), "Fetched wallet UTxOs");
        Ok(utxos)
    }

    async fn evaluate_tx(&self, tx_cbor: &[u8]) -> BlockchainResult<Vec<RedeemerBudget>> {
        // The evaluate endpoint takes the transaction as hex text.
        let response = self
            .post_cbor("evaluate", "/utils/txs/evaluate", hex::encode(tx_cbor).into_bytes())
            .await?;
        let body: serde_json::Value = self.read_json(response).await?;
        parse_evaluation(&body)
    }

    async fn submit_tx(&self, tx_cbor: &[u8]) -> BlockchainResult<TxHash> {
        let response = self.post_cbor("submit", "/tx/submit", tx_cbor.to_vec()).await?;
        let hash: String = self.read_json(response).await?;
        TxHash::from_hex(&hash)
    }

    async fn is_healthy(&self) -> bool {
        let healthy = matches!(
            self.get_json::<HealthResponse>("health", "/health").await,
            Ok(Some(HealthResponse { is_healthy: true }))
        );
        metrics::record_provider_health(healthy);
        healthy
    }
}

impl std::fmt::Debug for BlockfrostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockfrostClient")
            .field("base_urls", &self.base_urls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    is_healthy: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: serde_json::Value,
}

fn status_error(status: StatusCode, body: &str) -> BlockchainError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => match parsed.message {
            serde_json::Value::String(s) => format!("{}: {}", parsed.error, s),
            serde_json::Value::Null => parsed.error,
            other => format!("{}: {}", parsed.error, other),
        },
        Err(_) => body.to_string(),
    };
    BlockchainError::ProviderStatus {
        status: status.as_u16(),
        message,
    }
}

/// Blockfrost encodes large integers as strings and small ones as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Quantity {
    Number(u64),
    Text(String),
}

impl Quantity {
    fn value(&self, field: &str) -> BlockchainResult<u64> {
        match self {
            Quantity::Number(n) => Ok(*n),
            Quantity::Text(s) => s.parse().map_err(|_| {
                BlockchainError::Provider(format!("{} is not an integer: '{}'", field, s))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawParameters {
    min_fee_a: u64,
    min_fee_b: u64,
    max_tx_size: u64,
    coins_per_utxo_size: Option<Quantity>,
    price_mem: Option<f64>,
    price_step: Option<f64>,
    collateral_percent: Option<u64>,
    max_tx_ex_mem: Option<Quantity>,
    max_tx_ex_steps: Option<Quantity>,
    #[serde(default)]
    cost_models_raw: Option<HashMap<String, Vec<i64>>>,
}

impl RawParameters {
    fn into_parameters(self) -> BlockchainResult<ProtocolParameters> {
        let missing = |field: &str| {
            BlockchainError::Provider(format!("protocol parameters lack {}", field))
        };

        let mut cost_models = BTreeMap::new();
        for (language, model) in self.cost_models_raw.unwrap_or_default() {
            let script_type = match language.as_str() {
                "PlutusV1" => ScriptType::PlutusV1,
                "PlutusV2" => ScriptType::PlutusV2,
                "PlutusV3" => ScriptType::PlutusV3,
                _ => continue,
            };
            cost_models.insert(script_type, model);
        }

        Ok(ProtocolParameters {
            min_fee_a: self.min_fee_a,
            min_fee_b: self.min_fee_b,
            max_tx_size: self.max_tx_size,
            coins_per_utxo_size: self
                .coins_per_utxo_size
                .ok_or_else(|| missing("coins_per_utxo_size"))?
                .value("coins_per_utxo_size")?,
            price_mem: self.price_mem.ok_or_else(|| missing("price_mem"))?,
            price_step: self.price_step.ok_or_else(|| missing("price_step"))?,
            collateral_percent: self.collateral_percent.unwrap_or(150),
            max_tx_ex_units: ExUnits {
                mem: self
                    .max_tx_ex_mem
                    .ok_or_else(|| missing("max_tx_ex_mem"))?
                    .value("max_tx_ex_mem")?,
                steps: self
                    .max_tx_ex_steps
                    .ok_or_else(|| missing("max_tx_ex_steps"))?
                    .value("max_tx_ex_steps")?,
            },
            cost_models,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAmount {
    unit: String,
    quantity: Quantity,
}

#[derive(Debug, Deserialize)]
struct RawUtxo {
    tx_hash: String,
    output_index: u64,
    amount: Vec<RawAmount>,
}

impl RawUtxo {
    fn into_utxo(self) -> BlockchainResult<Utxo> {
        let mut value = Value::default();
        for amount in self.amount {
            let quantity = amount.quantity.value("quantity")?;
            if amount.unit == "lovelace" {
                value.coin += quantity;
                continue;
            }
            if amount.unit.len() < 56 {
                return Err(BlockchainError::Provider(format!(
                    "malformed asset unit '{}'",
                    amount.unit
                )));
            }
            let (policy_hex, name_hex) = amount.unit.split_at(56);
            let policy = PolicyId::from_hex(policy_hex)?;
            let name = hex::decode(name_hex)
                .map_err(|e| BlockchainError::Codec(format!("asset name is not hex: {}", e)))?;
            value.add_asset(policy, name, quantity);
        }
        Ok(Utxo {
            input: TxInput {
                tx_hash: TxHash::from_hex(&self.tx_hash)?,
                index: self.output_index,
            },
            value,
        })
    }
}

/// Parse an Ogmios-style evaluation answer.
fn parse_evaluation(body: &serde_json::Value) -> BlockchainResult<Vec<RedeemerBudget>> {
    let result = body
        .get("result")
        .ok_or_else(|| BlockchainError::Evaluation(format!("unexpected response: {}", body)))?;

    if let Some(failure) = result.get("EvaluationFailure") {
        return Err(BlockchainError::Evaluation(failure.to_string()));
    }

    let budgets = result
        .get("EvaluationResult")
        .and_then(|r| r.as_object())
        .ok_or_else(|| BlockchainError::Evaluation(format!("unexpected result: {}", result)))?;

    let mut out = Vec::with_capacity(budgets.len());
    for (key, budget) in budgets {
        let (purpose, index) = key
            .split_once(':')
            .ok_or_else(|| BlockchainError::Evaluation(format!("bad redeemer pointer '{}'", key)))?;
        let index = index
            .parse()
            .map_err(|_| BlockchainError::Evaluation(format!("bad redeemer pointer '{}'", key)))?;
        let mem = budget.get("memory").and_then(|v| v.as_u64());
        let steps = budget.get("steps").and_then(|v| v.as_u64());
        let (Some(mem), Some(steps)) = (mem, steps) else {
            return Err(BlockchainError::Evaluation(format!(
                "budget for '{}' is incomplete",
                key
            )));
        };
        out.push(RedeemerBudget {
            purpose: purpose.to_string(),
            index,
            ex_units: ExUnits { mem, steps },
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::Network;

    fn test_config() -> ChainConfig {
        ChainConfig {
            network: Network::Preprod,
            provider_url: Some("http://127.0.0.1:1".to_string()),
            failover_urls: Vec::new(),
            project_id: "preprodTEST".to_string(),
            request_timeout_secs: 1,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = BlockfrostClient::new(&test_config()).unwrap();
        assert_eq!(client.primary_url(), "http://127.0.0.1:1");
    }

    #[test]
    fn test_default_url_follows_network() {
        let mut config = test_config();
        config.provider_url = None;
        config.network = Network::Mainnet;
        let client = BlockfrostClient::new(&config).unwrap();
        assert!(client.primary_url().contains("cardano-mainnet"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = test_config();
        config.provider_url = Some("not a url".to_string());
        assert!(BlockfrostClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        let client = BlockfrostClient::new(&config).unwrap();
        let err = client.protocol_parameters().await.unwrap_err();
        assert!(err.to_string().contains("All provider endpoints failed"));
        assert!(!client.is_healthy().await);
    }

    #[test]
    fn test_parameters_parsing() {
        let json = serde_json::json!({
            "min_fee_a": 44,
            "min_fee_b": 155381,
            "max_tx_size": 16384,
            "coins_per_utxo_size": "4310",
            "price_mem": 0.0577,
            "price_step": 0.0000721,
            "collateral_percent": 150,
            "max_tx_ex_mem": "14000000",
            "max_tx_ex_steps": "10000000000",
            "cost_models_raw": { "PlutusV3": [1, 2, 3], "Unknown": [9] }
        });
        let raw: RawParameters = serde_json::from_value(json).unwrap();
        let params = raw.into_parameters().unwrap();
        assert_eq!(params.coins_per_utxo_size, 4310);
        assert_eq!(params.max_tx_ex_units.mem, 14_000_000);
        assert_eq!(params.cost_models.len(), 1);
        assert_eq!(params.cost_models[&ScriptType::PlutusV3], vec![1, 2, 3]);
    }

    #[test]
    fn test_utxo_parsing() {
        let json = serde_json::json!({
            "tx_hash": "aa".repeat(32),
            "output_index": 1,
            "amount": [
                { "unit": "lovelace", "quantity": "7000000" },
                { "unit": format!("{}{}", "bb".repeat(28), "4e4654"), "quantity": "2" }
            ]
        });
        let raw: RawUtxo = serde_json::from_value(json).unwrap();
        let utxo = raw.into_utxo().unwrap();
        assert_eq!(utxo.value.coin, 7_000_000);
        assert_eq!(utxo.input.index, 1);
        let policy = PolicyId([0xbb; 28]);
        assert_eq!(utxo.value.assets[&policy][&b"NFT".to_vec()], 2);
    }

    #[test]
    fn test_evaluation_parsing() {
        let ok = serde_json::json!({
            "type": "jsonwsp/response",
            "result": { "EvaluationResult": { "mint:0": { "memory": 1700, "steps": 476468 } } }
        });
        let budgets = parse_evaluation(&ok).unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].purpose, "mint");
        assert_eq!(budgets[0].ex_units, ExUnits { mem: 1700, steps: 476468 });

        let failed = serde_json::json!({
            "result": { "EvaluationFailure": { "ScriptFailures": {} } }
        });
        assert!(parse_evaluation(&failed).is_err());
    }

    #[test]
    fn test_status_error_message() {
        let err = status_error(
            StatusCode::FORBIDDEN,
            r#"{"status_code":403,"error":"Forbidden","message":"Invalid project token."}"#,
        );
        assert_eq!(
            err.to_string(),
            "Provider returned 403: Forbidden: Invalid project token."
        );
    }
}
