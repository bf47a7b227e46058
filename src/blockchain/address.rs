//! Shelley-era payment addresses.
//!
//! Only bech32 Shelley addresses are handled; Byron bootstrap addresses and
//! reward addresses cannot receive the minted token and are rejected.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};

use crate::blockchain::types::{BlockchainError, BlockchainResult, Network};

const ENTERPRISE_KEY_HEADER: u8 = 0b0110_0000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    bytes: Vec<u8>,
    bech32: String,
}

impl Address {
    /// Wrap raw address bytes, checking the header and length.
    pub fn from_bytes(bytes: Vec<u8>) -> BlockchainResult<Self> {
        let header = *bytes
            .first()
            .ok_or_else(|| BlockchainError::Address("empty address".into()))?;
        let expected_len = match header >> 4 {
            0..=3 => Some(57),
            4 | 5 => None,
            6 | 7 => Some(29),
            kind => {
                return Err(BlockchainError::Address(format!(
                    "address type {} cannot hold payments",
                    kind
                )))
            }
        };
        let valid_len = match expected_len {
            Some(len) => bytes.len() == len,
            None => bytes.len() > 29,
        };
        if !valid_len {
            return Err(BlockchainError::Address(format!(
                "address of type {} has invalid length {}",
                header >> 4,
                bytes.len()
            )));
        }

        let hrp = match header & 0x0f {
            1 => Network::Mainnet.address_hrp(),
            _ => Network::Preprod.address_hrp(),
        };
        let hrp = Hrp::parse(hrp).map_err(|e| BlockchainError::Address(e.to_string()))?;
        let bech32 = bech32::encode::<Bech32>(hrp, &bytes)
            .map_err(|e| BlockchainError::Address(e.to_string()))?;
        Ok(Self { bytes, bech32 })
    }

    pub fn from_bech32(s: &str) -> BlockchainResult<Self> {
        let (hrp, bytes) = bech32::decode(s.trim())
            .map_err(|e| BlockchainError::Address(format!("invalid bech32 '{}': {}", s, e)))?;
        let address = Self::from_bytes(bytes)?;
        let expected = if address.network_id() == Network::Mainnet.network_id() {
            Network::Mainnet.address_hrp()
        } else {
            Network::Preprod.address_hrp()
        };
        if hrp.to_lowercase() != expected {
            return Err(BlockchainError::Address(format!(
                "prefix '{}' does not match network id {}",
                hrp,
                address.network_id()
            )));
        }
        Ok(address)
    }

    /// Enterprise address paying to a verification key hash.
    pub fn enterprise(network: Network, key_hash: [u8; 28]) -> BlockchainResult<Self> {
        let mut bytes = Vec::with_capacity(29);
        bytes.push(ENTERPRISE_KEY_HEADER | network.network_id());
        bytes.extend_from_slice(&key_hash);
        Self::from_bytes(bytes)
    }

    pub fn network_id(&self) -> u8 {
        self.bytes[0] & 0x0f
    }

    /// Payment key hash, when the payment credential is a key.
    pub fn payment_key_hash(&self) -> Option<[u8; 28]> {
        if (self.bytes[0] >> 4) % 2 != 0 {
            return None;
        }
        self.bytes.get(1..29)?.try_into().ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_bech32(&self) -> &str {
        &self.bech32
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bech32)
    }
}

impl FromStr for Address {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.bech32)
    }
}
