//! Minting policy scripts and policy id derivation.

use ciborium::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::cbor;
use crate::blockchain::hash::blake2b_224;
use crate::blockchain::types::{BlockchainError, BlockchainResult, PolicyId};

/// Plutus language version of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ScriptType {
    PlutusV1,
    PlutusV2,
    #[default]
    PlutusV3,
}

impl ScriptType {
    /// Prefix byte hashed in front of the script to form its hash.
    pub fn hash_tag(self) -> u8 {
        match self {
            ScriptType::PlutusV1 => 1,
            ScriptType::PlutusV2 => 2,
            ScriptType::PlutusV3 => 3,
        }
    }

    /// Language id used as the key of the cost model views.
    pub fn language_id(self) -> u64 {
        match self {
            ScriptType::PlutusV1 => 0,
            ScriptType::PlutusV2 => 1,
            ScriptType::PlutusV3 => 2,
        }
    }

    /// Witness set field holding scripts of this language.
    pub fn witness_key(self) -> u64 {
        match self {
            ScriptType::PlutusV1 => 3,
            ScriptType::PlutusV2 => 6,
            ScriptType::PlutusV3 => 7,
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptType::PlutusV1 => "PlutusV1",
            ScriptType::PlutusV2 => "PlutusV2",
            ScriptType::PlutusV3 => "PlutusV3",
        };
        f.write_str(name)
    }
}

/// A Plutus minting policy.
///
/// The script is held in its ledger form: one CBOR byte-string layer around
/// the flat-encoded program. Raw flat bytes and the doubly wrapped form that
/// compilers emit for wallets are both accepted and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintingPolicy {
    script_type: ScriptType,
    script: Vec<u8>,
}

impl MintingPolicy {
    pub fn new(script_type: ScriptType, raw: Vec<u8>) -> BlockchainResult<Self> {
        if raw.is_empty() {
            return Err(BlockchainError::Codec("minting script is empty".into()));
        }
        let script = normalize_script(raw)?;
        Ok(Self { script_type, script })
    }

    pub fn from_hex(script_type: ScriptType, script_hex: &str) -> BlockchainResult<Self> {
        let raw = hex::decode(script_hex.trim())
            .map_err(|e| BlockchainError::Codec(format!("minting script is not hex: {}", e)))?;
        Self::new(script_type, raw)
    }

    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    /// Script bytes as they appear in the witness set.
    pub fn script_bytes(&self) -> &[u8] {
        &self.script
    }

    pub fn policy_id(&self) -> PolicyId {
        PolicyId(blake2b_224(&[&[self.script_type.hash_tag()][..], &self.script[..]]))
    }
}

fn unwrap_bytestring(bytes: &[u8]) -> Option<Vec<u8>> {
    match cbor::from_slice(bytes) {
        Ok(Value::Bytes(inner)) => Some(inner),
        _ => None,
    }
}

fn normalize_script(raw: Vec<u8>) -> BlockchainResult<Vec<u8>> {
    match unwrap_bytestring(&raw) {
        Some(inner) if unwrap_bytestring(&inner).is_some() => Ok(inner),
        Some(_) => Ok(raw),
        None => cbor::to_vec(&Value::Bytes(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Always-succeeds validator in its ledger (single-wrapped) form.
    const ALWAYS_SUCCEEDS: &str = "480100002221200101";

    #[test]
    fn test_policy_id_is_deterministic() {
        let a = MintingPolicy::from_hex(ScriptType::PlutusV2, ALWAYS_SUCCEEDS).unwrap();
        let b = MintingPolicy::from_hex(ScriptType::PlutusV2, ALWAYS_SUCCEEDS).unwrap();
        assert_eq!(a.policy_id(), b.policy_id());
        assert_eq!(a.policy_id().to_string().len(), 56);
    }

    #[test]
    fn test_language_changes_policy_id() {
        let v2 = MintingPolicy::from_hex(ScriptType::PlutusV2, ALWAYS_SUCCEEDS).unwrap();
        let v3 = MintingPolicy::from_hex(ScriptType::PlutusV3, ALWAYS_SUCCEEDS).unwrap();
        assert_ne!(v2.policy_id(), v3.policy_id());
    }

    #[test]
    fn test_wrapping_forms_normalize() {
        let single = MintingPolicy::from_hex(ScriptType::PlutusV3, ALWAYS_SUCCEEDS).unwrap();
        let double_hex = format!("49{}", ALWAYS_SUCCEEDS);
        let double = MintingPolicy::from_hex(ScriptType::PlutusV3, &double_hex).unwrap();
        assert_eq!(single, double);

        let flat = hex::decode(&ALWAYS_SUCCEEDS[2..]).unwrap();
        let from_flat = MintingPolicy::new(ScriptType::PlutusV3, flat).unwrap();
        assert_eq!(single, from_flat);
        assert_eq!(hex::encode(single.script_bytes()), ALWAYS_SUCCEEDS);
    }

    #[test]
    fn test_invalid_scripts() {
        assert!(MintingPolicy::from_hex(ScriptType::PlutusV3, "zz").is_err());
        assert!(MintingPolicy::from_hex(ScriptType::PlutusV3, "").is_err());
    }
}
