//! Multi-asset values, UTxOs and transaction outputs.

use ciborium::Value as Cbor;
use std::collections::BTreeMap;

use crate::blockchain::address::Address;
use crate::blockchain::cbor;
use crate::blockchain::plutus::PlutusData;
use crate::blockchain::types::{BlockchainError, BlockchainResult, PolicyId, TxHash};

/// Lovelace plus native assets grouped by policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub coin: u64,
    pub assets: BTreeMap<PolicyId, BTreeMap<Vec<u8>, u64>>,
}

impl Value {
    pub fn lovelace(coin: u64) -> Self {
        Self {
            coin,
            assets: BTreeMap::new(),
        }
    }

    pub fn with_asset(mut self, policy: PolicyId, name: Vec<u8>, quantity: u64) -> Self {
        self.add_asset(policy, name, quantity);
        self
    }

    pub fn add_asset(&mut self, policy: PolicyId, name: Vec<u8>, quantity: u64) {
        if quantity == 0 {
            return;
        }
        *self.assets.entry(policy).or_default().entry(name).or_insert(0) += quantity;
    }

    pub fn is_pure_ada(&self) -> bool {
        self.assets.is_empty()
    }

    /// Merge `other` into `self`.
    pub fn add(&mut self, other: &Value) -> BlockchainResult<()> {
        self.coin = self
            .coin
            .checked_add(other.coin)
            .ok_or_else(|| BlockchainError::Build("lovelace overflow".into()))?;
        for (policy, names) in &other.assets {
            for (name, quantity) in names {
                self.add_asset(*policy, name.clone(), *quantity);
            }
        }
        Ok(())
    }

    pub fn to_cbor(&self) -> Cbor {
        if self.assets.is_empty() {
            return cbor::uint(self.coin);
        }
        let multiasset = self
            .assets
            .iter()
            .map(|(policy, names)| {
                let inner = names
                    .iter()
                    .map(|(name, quantity)| (cbor::bytes(name.clone()), cbor::uint(*quantity)))
                    .collect();
                (cbor::bytes(policy.0.to_vec()), Cbor::Map(inner))
            })
            .collect();
        Cbor::Array(vec![cbor::uint(self.coin), Cbor::Map(multiasset)])
    }
}

/// Reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxInput {
    pub tx_hash: TxHash,
    pub index: u64,
}

impl TxInput {
    pub fn to_cbor(&self) -> Cbor {
        Cbor::Array(vec![cbor::bytes(self.tx_hash.0.to_vec()), cbor::uint(self.index)])
    }
}

/// An unspent output owned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub input: TxInput,
    pub value: Value,
}

/// A transaction output in the post-Alonzo map form.
#[derive(Debug, Clone, PartialEq)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
    pub inline_datum: Option<PlutusData>,
}

impl TxOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            inline_datum: None,
        }
    }

    pub fn with_inline_datum(mut self, datum: PlutusData) -> Self {
        self.inline_datum = Some(datum);
        self
    }

    pub fn to_cbor(&self) -> BlockchainResult<Cbor> {
        let mut fields = vec![
            (cbor::uint(0), cbor::bytes(self.address.as_bytes().to_vec())),
            (cbor::uint(1), self.value.to_cbor()),
        ];
        if let Some(datum) = &self.inline_datum {
            let embedded = Cbor::Tag(24, Box::new(cbor::bytes(datum.to_cbor()?)));
            fields.push((cbor::uint(2), Cbor::Array(vec![cbor::uint(1), embedded])));
        }
        Ok(Cbor::Map(fields))
    }

    pub fn encoded_len(&self) -> BlockchainResult<u64> {
        Ok(cbor::to_vec(&self.to_cbor()?)?.len() as u64)
    }

    /// Minimum lovelace this output must hold under `coins_per_utxo_size`.
    pub fn min_lovelace(&self, coins_per_utxo_size: u64) -> BlockchainResult<u64> {
        let mut probe = self.clone();
        probe.value.coin = 0;
        // The coin's own encoding width feeds back into the size; a few
        // rounds settle it.
        for _ in 0..4 {
            let required = coins_per_utxo_size * (160 + probe.encoded_len()?);
            if required <= probe.value.coin {
                break;
            }
            probe.value.coin = required;
        }
        Ok(probe.value.coin)
    }
}
