//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::blockchain::policy::ScriptType;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Cardano network the minter is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Network {
    #[default]
    Preprod,
    Mainnet,
}

impl Network {
    /// Network id carried in the address header and reported by wallets.
    pub fn network_id(self) -> u8 {
        match self {
            Network::Preprod => 0,
            Network::Mainnet => 1,
        }
    }

    /// Default Blockfrost base URL for this network.
    pub fn blockfrost_url(self) -> &'static str {
        match self {
            Network::Preprod => "https://cardano-preprod.blockfrost.io/api/v0",
            Network::Mainnet => "https://cardano-mainnet.blockfrost.io/api/v0",
        }
    }

    /// Human readable part used for bech32 payment addresses.
    pub fn address_hrp(self) -> &'static str {
        match self {
            Network::Preprod => "addr_test",
            Network::Mainnet => "addr",
        }
    }

    /// Block explorer link for a submitted transaction.
    pub fn explorer_tx_url(self, tx_hash: &TxHash) -> String {
        match self {
            Network::Preprod => format!("https://preprod.cardanoscan.io/transaction/{}", tx_hash),
            Network::Mainnet => format!("https://cardanoscan.io/transaction/{}", tx_hash),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Preprod => f.write_str("Preprod"),
            Network::Mainnet => f.write_str("Mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preprod" => Ok(Network::Preprod),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(BlockchainError::Config(format!(
                "Unknown network '{}', expected Preprod or Mainnet",
                other
            ))),
        }
    }
}

/// Transaction id: blake2b-256 of the transaction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn from_hex(s: &str) -> BlockchainResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| BlockchainError::Codec(format!("Invalid tx hash '{}': {}", s, e)))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| BlockchainError::Codec(format!("Tx hash '{}' is not 32 bytes", s)))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Minting policy id: blake2b-224 of the tagged policy script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId(pub [u8; 28]);

impl PolicyId {
    pub fn from_hex(s: &str) -> BlockchainResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| BlockchainError::Codec(format!("Invalid policy id '{}': {}", s, e)))?;
        let arr: [u8; 28] = bytes
            .try_into()
            .map_err(|_| BlockchainError::Codec(format!("Policy id '{}' is not 28 bytes", s)))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for PolicyId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Script execution budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

/// The subset of protocol parameters needed to balance a minting transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolParameters {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub max_tx_size: u64,
    pub coins_per_utxo_size: u64,
    pub price_mem: f64,
    pub price_step: f64,
    pub collateral_percent: u64,
    pub max_tx_ex_units: ExUnits,
    pub cost_models: BTreeMap<ScriptType, Vec<i64>>,
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Provider connection or request failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider answered with a non-success status.
    #[error("Provider returned {status}: {message}")]
    ProviderStatus { status: u16, message: String },

    /// Provider request timed out.
    #[error("Provider timeout after {0} seconds")]
    Timeout(u64),

    /// CBOR or hex encoding problem.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Malformed or unsupported address.
    #[error("Address error: {0}")]
    Address(String),

    /// Wallet could not be enabled or refused to sign.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Wallet and minter are on different networks.
    #[error("Network mismatch: expected network id {expected}, wallet reports {actual}")]
    NetworkMismatch { expected: u8, actual: u8 },

    /// Wallet UTxOs cannot cover outputs and fees.
    #[error("Insufficient funds: need {required} lovelace, wallet holds {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// No pure-ADA UTxO large enough to serve as collateral.
    #[error("No suitable collateral UTxO (need a pure-ADA output of at least {0} lovelace)")]
    NoCollateral(u64),

    /// Script evaluation failed or returned no budget.
    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    /// Transaction could not be balanced.
    #[error("Transaction build error: {0}")]
    Build(String),

    /// Invalid chain configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("Preprod".parse::<Network>().unwrap(), Network::Preprod);
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("testnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_ids_and_urls() {
        assert_eq!(Network::Preprod.network_id(), 0);
        assert_eq!(Network::Mainnet.network_id(), 1);
        assert!(Network::Preprod.blockfrost_url().contains("cardano-preprod"));
        assert!(Network::Mainnet.blockfrost_url().contains("cardano-mainnet"));
    }

    #[test]
    fn test_explorer_link() {
        let hash = TxHash([0xab; 32]);
        let url = Network::Preprod.explorer_tx_url(&hash);
        assert!(url.starts_with("https://preprod.cardanoscan.io/transaction/abab"));
        let url = Network::Mainnet.explorer_tx_url(&hash);
        assert!(url.starts_with("https://cardanoscan.io/transaction/"));
    }

    #[test]
    fn test_hash_hex_parsing() {
        let hex_str = "11".repeat(32);
        let hash = TxHash::from_hex(&hex_str).unwrap();
        assert_eq!(hash.to_string(), hex_str);
        assert!(TxHash::from_hex("abcd").is_err());
        assert!(PolicyId::from_hex(&"22".repeat(28)).is_ok());
        assert!(PolicyId::from_hex(&"22".repeat(32)).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "Provider timeout after 10 seconds");

        let err = BlockchainError::InsufficientFunds {
            required: 5_000_000,
            available: 1_000_000,
        };
        assert!(err.to_string().contains("5000000"));
    }
}
