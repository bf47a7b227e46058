//! Minting transaction building, balancing and witness assembly.
//!
//! # Responsibilities
//! - Select wallet inputs and collateral
//! - Evaluate the minting script budget through the provider
//! - Iterate the fee until it covers the final transaction size
//! - Attach wallet signatures to produce a submittable transaction
//!
//! # Layout
//! ```text
//! tx      = [ body, witness_set, true, null ]
//! body    = { 0: inputs, 1: [nft, change], 2: fee, 9: mint, 11: script_data_hash,
//!             13: collateral, 15: network_id, 16?: collateral_return, 17?: total_collateral }
//! witness = { 0?: vkeys, 5: redeemers, 3|6|7: [script] }
//! ```

use ciborium::Value as Cbor;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::blockchain::address::Address;
use crate::blockchain::cbor;
use crate::blockchain::client::ChainProvider;
use crate::blockchain::hash::blake2b_256;
use crate::blockchain::plutus::PlutusData;
use crate::blockchain::policy::{MintingPolicy, ScriptType};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ExUnits, PolicyId, ProtocolParameters, TxHash,
};
use crate::blockchain::value::{TxInput, TxOutput, Utxo, Value};
use crate::blockchain::wallet::VKeyWitness;

/// Smallest pure-ADA output accepted as collateral.
pub const COLLATERAL_TARGET: u64 = 5_000_000;

const MAX_BALANCE_ROUNDS: usize = 10;
const REDEEMER_TAG_MINT: u64 = 1;

/// What to mint and where to send it.
#[derive(Debug, Clone)]
pub struct MintPlan {
    pub policy: MintingPolicy,
    pub asset_name: Vec<u8>,
    pub quantity: u64,
    pub redeemer: PlutusData,
    pub recipient: Address,
    pub inline_datum: Option<PlutusData>,
}

#[derive(Debug, Clone)]
struct WitnessParts {
    script_type: ScriptType,
    script: Vec<u8>,
    redeemers: Cbor,
}

impl WitnessParts {
    fn encode(&self, vkeys: &[VKeyWitness]) -> BlockchainResult<Vec<u8>> {
        let mut fields = BTreeMap::new();
        if !vkeys.is_empty() {
            let entries = vkeys
                .iter()
                .map(|w| {
                    Cbor::Array(vec![
                        cbor::bytes(w.vkey.to_vec()),
                        cbor::bytes(w.signature.to_vec()),
                    ])
                })
                .collect();
            fields.insert(0, Cbor::Array(entries));
        }
        fields.insert(5, self.redeemers.clone());
        fields.insert(
            self.script_type.witness_key(),
            Cbor::Array(vec![cbor::bytes(self.script.clone())]),
        );
        cbor::to_vec(&Cbor::Map(
            fields.into_iter().map(|(k, v)| (cbor::uint(k), v)).collect(),
        ))
    }
}

fn tx_bytes(body: &[u8], witness_set: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + witness_set.len() + 3);
    out.push(0x84);
    out.extend_from_slice(body);
    out.extend_from_slice(witness_set);
    // valid, no auxiliary data
    out.push(0xf5);
    out.push(0xf6);
    out
}

/// A balanced transaction waiting for wallet signatures.
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    body: Vec<u8>,
    id: TxHash,
    fee: u64,
    input_count: usize,
    witness: WitnessParts,
}

impl UnsignedTx {
    /// Transaction id, the hash every signature commits to.
    pub fn id(&self) -> TxHash {
        self.id
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Serialized transaction without key witnesses.
    pub fn to_cbor(&self) -> BlockchainResult<Vec<u8>> {
        Ok(tx_bytes(&self.body, &self.witness.encode(&[])?))
    }

    /// Attach wallet signatures, rejecting any that do not verify.
    pub fn assemble(self, witnesses: Vec<VKeyWitness>) -> BlockchainResult<SignedTx> {
        if witnesses.is_empty() {
            return Err(BlockchainError::Wallet("wallet returned no signatures".into()));
        }
        for witness in &witnesses {
            let vkey = VerifyingKey::from_bytes(&witness.vkey)
                .map_err(|e| BlockchainError::Wallet(format!("invalid verification key: {}", e)))?;
            vkey.verify(&self.id.0, &Signature::from_bytes(&witness.signature))
                .map_err(|_| {
                    BlockchainError::Wallet("signature does not match transaction body".into())
                })?;
        }
        let bytes = tx_bytes(&self.body, &self.witness.encode(&witnesses)?);
        Ok(SignedTx { bytes, id: self.id })
    }
}

/// A fully witnessed transaction ready for submission.
#[derive(Debug, Clone)]
pub struct SignedTx {
    bytes: Vec<u8>,
    id: TxHash,
}

impl SignedTx {
    pub fn id(&self) -> TxHash {
        self.id
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Builds minting transactions against a chain provider.
pub struct TxBuilder {
    provider: Arc<dyn ChainProvider>,
}

impl TxBuilder {
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// Build a balanced transaction minting `plan`, funded from and
    /// returning change to `change_address`.
    pub async fn build_mint(
        &self,
        plan: &MintPlan,
        change_address: &Address,
    ) -> BlockchainResult<UnsignedTx> {
        let params = self.provider.protocol_parameters().await?;
        let utxos = self.provider.utxos_at(change_address).await?;

        let script_type = plan.policy.script_type();
        let cost_model = params.cost_models.get(&script_type).ok_or_else(|| {
            BlockchainError::Build(format!("provider returned no {} cost model", script_type))
        })?;

        let policy_id = plan.policy.policy_id();
        let mut nft_output = TxOutput::new(
            plan.recipient.clone(),
            Value::lovelace(0).with_asset(policy_id, plan.asset_name.clone(), plan.quantity),
        );
        if let Some(datum) = &plan.inline_datum {
            nft_output = nft_output.with_inline_datum(datum.clone());
        }
        nft_output.value.coin = nft_output.min_lovelace(params.coins_per_utxo_size)?;

        let collateral = select_collateral(&utxos);
        let balancer = Balancer {
            params: &params,
            plan,
            policy_id,
            language_views: language_views(script_type, cost_model)?,
            utxos: sorted_by_lovelace(&utxos),
            nft_output,
            collateral,
            change_address,
        };

        // Draft with the maximum budget so the evaluator sees a complete transaction.
        let draft = balancer.balance(params.max_tx_ex_units)?;
        let budgets = self.provider.evaluate_tx(&draft.to_cbor()?).await?;
        let ex_units = budgets
            .iter()
            .find(|b| b.purpose == "mint" && b.index == 0)
            .map(|b| b.ex_units)
            .ok_or_else(|| {
                BlockchainError::Evaluation("no budget reported for the mint redeemer".into())
            })?;
        tracing::debug!(mem = ex_units.mem, steps = ex_units.steps, "Evaluated minting script budget");

        let tx = balancer.balance(ex_units)?;
        tracing::info!(
            tx_hash = %tx.id(),
            fee = tx.fee(),
            inputs = tx.input_count(),
            "Minting transaction balanced"
        );
        Ok(tx)
    }
}

fn sorted_by_lovelace(utxos: &[Utxo]) -> Vec<Utxo> {
    let mut sorted = utxos.to_vec();
    sorted.sort_by(|a, b| b.value.coin.cmp(&a.value.coin).then(a.input.cmp(&b.input)));
    sorted
}

/// Smallest pure-ADA UTxO holding at least [`COLLATERAL_TARGET`].
fn select_collateral(utxos: &[Utxo]) -> Option<Utxo> {
    utxos
        .iter()
        .filter(|u| u.value.is_pure_ada() && u.value.coin >= COLLATERAL_TARGET)
        .min_by_key(|u| (u.value.coin, u.input))
        .cloned()
}

/// Cost model view hashed into `script_data_hash`.
fn language_views(script_type: ScriptType, cost_model: &[i64]) -> BlockchainResult<Vec<u8>> {
    let ints: Vec<Cbor> = cost_model.iter().map(|c| Cbor::Integer((*c).into())).collect();
    let view = match script_type {
        // PlutusV1 keeps its historical quirk: both key and value are
        // wrapped byte strings, the value an indefinite-length list.
        ScriptType::PlutusV1 => {
            let mut list = vec![0x9f];
            for i in &ints {
                list.extend(cbor::to_vec(i)?);
            }
            list.push(0xff);
            Cbor::Map(vec![(cbor::bytes(vec![0x00]), cbor::bytes(list))])
        }
        other => Cbor::Map(vec![(cbor::uint(other.language_id()), Cbor::Array(ints))]),
    };
    cbor::to_vec(&view)
}

struct Balancer<'a> {
    params: &'a ProtocolParameters,
    plan: &'a MintPlan,
    policy_id: PolicyId,
    language_views: Vec<u8>,
    utxos: Vec<Utxo>,
    nft_output: TxOutput,
    collateral: Option<Utxo>,
    change_address: &'a Address,
}

impl Balancer<'_> {
    fn balance(&self, ex_units: ExUnits) -> BlockchainResult<UnsignedTx> {
        let redeemers = Cbor::Array(vec![Cbor::Array(vec![
            cbor::uint(REDEEMER_TAG_MINT),
            cbor::uint(0),
            self.plan.redeemer.to_value()?,
            Cbor::Array(vec![cbor::uint(ex_units.mem), cbor::uint(ex_units.steps)]),
        ])]);
        let redeemer_bytes = cbor::to_vec(&redeemers)?;
        let script_data_hash = blake2b_256(&[&redeemer_bytes[..], &self.language_views[..]]);
        let witness = WitnessParts {
            script_type: self.plan.policy.script_type(),
            script: self.plan.policy.script_bytes().to_vec(),
            redeemers,
        };
        // Size estimate: one key witness per transaction; all inputs share the wallet key.
        let probe_witnesses = witness.encode(&[VKeyWitness {
            vkey: [0u8; 32],
            signature: [0u8; 64],
        }])?;

        let script_fee = (self.params.price_mem * ex_units.mem as f64
            + self.params.price_step * ex_units.steps as f64)
            .ceil() as u64;

        let mut fee = self.params.min_fee_b + script_fee;
        for _ in 0..MAX_BALANCE_ROUNDS {
            let (inputs, change) = self.select_inputs(fee)?;
            let body = self.encode_body(&inputs, &change, fee, &script_data_hash)?;
            let size = tx_bytes(&body, &probe_witnesses).len() as u64;
            if size > self.params.max_tx_size {
                return Err(BlockchainError::Build(format!(
                    "transaction size {} exceeds limit {}",
                    size, self.params.max_tx_size
                )));
            }
            let required = self.params.min_fee_a * size + self.params.min_fee_b + script_fee;
            if required <= fee {
                return Ok(UnsignedTx {
                    id: TxHash(blake2b_256(&[&body[..]])),
                    body,
                    fee,
                    input_count: inputs.len(),
                    witness,
                });
            }
            fee = required;
        }
        Err(BlockchainError::Build("fee did not converge".into()))
    }

    /// Largest-first selection covering the NFT output, the fee and a
    /// change output that satisfies min-ADA.
    fn select_inputs(&self, fee: u64) -> BlockchainResult<(Vec<TxInput>, TxOutput)> {
        let target = self.nft_output.value.coin + fee;
        let mut selected = Vec::new();
        let mut total = Value::default();
        for utxo in &self.utxos {
            selected.push(utxo.input);
            total.add(&utxo.value)?;
            if total.coin < target {
                continue;
            }
            let mut change_value = total.clone();
            change_value.coin = total.coin - target;
            let change = TxOutput::new(self.change_address.clone(), change_value);
            if change.value.coin >= change.min_lovelace(self.params.coins_per_utxo_size)? {
                selected.sort();
                return Ok((selected, change));
            }
        }
        Err(BlockchainError::InsufficientFunds {
            required: target,
            available: total.coin,
        })
    }

    fn encode_body(
        &self,
        inputs: &[TxInput],
        change: &TxOutput,
        fee: u64,
        script_data_hash: &[u8; 32],
    ) -> BlockchainResult<Vec<u8>> {
        let collateral = self
            .collateral
            .as_ref()
            .ok_or(BlockchainError::NoCollateral(COLLATERAL_TARGET))?;
        let total_collateral = (fee * self.params.collateral_percent).div_ceil(100);
        if collateral.value.coin < total_collateral {
            return Err(BlockchainError::NoCollateral(total_collateral));
        }

        let mint = Cbor::Map(vec![(
            cbor::bytes(self.policy_id.0.to_vec()),
            Cbor::Map(vec![(
                cbor::bytes(self.plan.asset_name.clone()),
                cbor::uint(self.plan.quantity),
            )]),
        )]);

        let mut fields = vec![
            (cbor::uint(0), Cbor::Array(inputs.iter().map(TxInput::to_cbor).collect())),
            (
                cbor::uint(1),
                Cbor::Array(vec![self.nft_output.to_cbor()?, change.to_cbor()?]),
            ),
            (cbor::uint(2), cbor::uint(fee)),
            (cbor::uint(9), mint),
            (cbor::uint(11), cbor::bytes(script_data_hash.to_vec())),
            (
                cbor::uint(13),
                Cbor::Array(vec![collateral.input.to_cbor()]),
            ),
            (
                cbor::uint(15),
                cbor::uint(u64::from(self.change_address.network_id())),
            ),
        ];

        let collateral_return = TxOutput::new(
            self.change_address.clone(),
            Value::lovelace(collateral.value.coin - total_collateral),
        );
        if collateral_return.value.coin
            >= collateral_return.min_lovelace(self.params.coins_per_utxo_size)?
        {
            fields.push((cbor::uint(16), collateral_return.to_cbor()?));
            fields.push((cbor::uint(17), cbor::uint(total_collateral)));
        }

        cbor::to_vec(&Cbor::Map(fields))
    }
}
