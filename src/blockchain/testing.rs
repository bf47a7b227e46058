//! In-memory chain provider for unit tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::blockchain::address::Address;
use crate::blockchain::client::{ChainProvider, RedeemerBudget};
use crate::blockchain::hash::blake2b_256;
use crate::blockchain::policy::{MintingPolicy, ScriptType};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ExUnits, Network, ProtocolParameters, TxHash,
};
use crate::blockchain::value::{TxInput, Utxo, Value};
use crate::blockchain::wallet::KeyWallet;

// RFC 8032 test vector 1 secret key.
pub const TEST_SIGNING_KEY: &str =
    "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

/// Single-wrapped always-succeeds Plutus script.
pub const ALWAYS_SUCCEEDS: &str = "480100002221200101";

pub fn test_policy() -> MintingPolicy {
    MintingPolicy::from_hex(ScriptType::PlutusV2, ALWAYS_SUCCEEDS).unwrap()
}

pub fn test_params() -> ProtocolParameters {
    let mut cost_models = BTreeMap::new();
    for script_type in [ScriptType::PlutusV1, ScriptType::PlutusV2, ScriptType::PlutusV3] {
        cost_models.insert(script_type, vec![100_788, 420, 1, 1, -5, 1000]);
    }
    ProtocolParameters {
        min_fee_a: 44,
        min_fee_b: 155_381,
        max_tx_size: 16_384,
        coins_per_utxo_size: 4_310,
        price_mem: 0.0577,
        price_step: 0.0000721,
        collateral_percent: 150,
        max_tx_ex_units: ExUnits {
            mem: 14_000_000,
            steps: 10_000_000_000,
        },
        cost_models,
    }
}

pub fn test_wallet(network: Network) -> KeyWallet {
    KeyWallet::from_signing_key_hex(TEST_SIGNING_KEY, network).unwrap()
}

pub fn wallet_utxo(index: u64, lovelace: u64) -> Utxo {
    Utxo {
        input: TxInput {
            tx_hash: TxHash([7u8; 32]),
            index,
        },
        value: Value::lovelace(lovelace),
    }
}

pub struct MockProvider {
    pub params: ProtocolParameters,
    pub utxos: Vec<Utxo>,
    pub budget: ExUnits,
    pub fail_evaluation: bool,
    pub fail_submit: bool,
    pub fail_parameters: bool,
    evaluations: AtomicUsize,
    parameter_calls: AtomicUsize,
    pub submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockProvider {
    pub fn with_utxos(utxos: Vec<Utxo>) -> Self {
        Self {
            params: test_params(),
            utxos,
            budget: ExUnits {
                mem: 1_200,
                steps: 450_000,
            },
            fail_evaluation: false,
            fail_submit: false,
            fail_parameters: false,
            evaluations: AtomicUsize::new(0),
            parameter_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn parameter_calls(&self) -> usize {
        self.parameter_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn protocol_parameters(&self) -> BlockchainResult<ProtocolParameters> {
        self.parameter_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_parameters {
            return Err(BlockchainError::Provider("connection refused".into()));
        }
        Ok(self.params.clone())
    }

    async fn utxos_at(&self, _address: &Address) -> BlockchainResult<Vec<Utxo>> {
        Ok(self.utxos.clone())
    }

    async fn evaluate_tx(&self, _tx_cbor: &[u8]) -> BlockchainResult<Vec<RedeemerBudget>> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if self.fail_evaluation {
            return Err(BlockchainError::Evaluation("script failed".into()));
        }
        Ok(vec![RedeemerBudget {
            purpose: "mint".into(),
            index: 0,
            ex_units: self.budget,
        }])
    }

    async fn submit_tx(&self, tx_cbor: &[u8]) -> BlockchainResult<TxHash> {
        if self.fail_submit {
            return Err(BlockchainError::ProviderStatus {
                status: 400,
                message: "BadInputsUTxO".into(),
            });
        }
        self.submitted.lock().unwrap().push(tx_cbor.to_vec());
        // Hash of the re-encoded body, matching a real node for canonical input.
        let body = crate::blockchain::cbor::from_slice(tx_cbor)
            .ok()
            .and_then(|v| match v {
                ciborium::Value::Array(mut parts) if !parts.is_empty() => Some(parts.remove(0)),
                _ => None,
            })
            .and_then(|body| crate::blockchain::cbor::to_vec(&body).ok())
            .unwrap_or_default();
        Ok(TxHash(blake2b_256(&[&body[..]])))
    }

    async fn is_healthy(&self) -> bool {
        !self.fail_parameters
    }
}
