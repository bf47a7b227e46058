//! Mint request construction.
//!
//! Everything here is deterministic: the same token settings and policy
//! always yield the same datum, redeemer and asset unit.

use serde::Serialize;

use crate::blockchain::cip68::{self, Cip68Metadata};
use crate::blockchain::{BlockchainError, BlockchainResult, MintingPolicy, PlutusData, PolicyId};
use crate::config::TokenConfig;

/// Everything needed to mint one CIP-68 token.
#[derive(Debug, Clone, PartialEq)]
pub struct MintRequest {
    pub metadata: Cip68Metadata,
    pub label: u16,
    /// Reference datum: `Constr 0 [ {name, image}, version ]`.
    pub datum: PlutusData,
    /// Unit redeemer `Constr 0 []`.
    pub redeemer: PlutusData,
    pub policy_id: PolicyId,
    pub asset_name: Vec<u8>,
    pub unit: String,
}

/// Hex rendering of a [`MintRequest`] for the API and CLI.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RequestView {
    pub token_name: String,
    pub image: String,
    pub version: u64,
    pub label: u16,
    pub policy_id: String,
    pub asset_name: String,
    pub unit: String,
    pub datum: String,
    pub redeemer: String,
}

impl MintRequest {
    pub fn build(token: &TokenConfig, policy: &MintingPolicy) -> BlockchainResult<Self> {
        let label = u16::try_from(token.label).map_err(|_| {
            BlockchainError::Config(format!("label {} does not fit in 16 bits", token.label))
        })?;
        let metadata = Cip68Metadata {
            name: token.name.clone(),
            image: token.image.clone(),
            version: token.version,
        };
        let datum = metadata.to_datum();
        // Fails on over-long fields before anything reaches the chain.
        datum.to_cbor()?;

        let policy_id = policy.policy_id();
        let asset_name = cip68::asset_name(label, &token.name);
        let unit = cip68::to_unit(&policy_id, &asset_name);

        Ok(Self {
            metadata,
            label,
            datum,
            redeemer: PlutusData::constr(0, vec![]),
            policy_id,
            asset_name,
            unit,
        })
    }

    pub fn view(&self) -> BlockchainResult<RequestView> {
        Ok(RequestView {
            token_name: self.metadata.name.clone(),
            image: self.metadata.image.clone(),
            version: self.metadata.version,
            label: self.label,
            policy_id: self.policy_id.to_string(),
            asset_name: hex::encode(&self.asset_name),
            unit: self.unit.clone(),
            datum: self.datum.to_hex()?,
            redeemer: self.redeemer.to_hex()?,
        })
    }
}
