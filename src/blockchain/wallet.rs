//! Wallet extensions, wallet sessions and transaction signing.
//!
//! # Security
//! - Signing keys are loaded ONLY from environment variables (or handed in
//!   directly by tests)
//! - Keys are never logged or serialized

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::blockchain::address::Address;
use crate::blockchain::hash::blake2b_224;
use crate::blockchain::transaction::UnsignedTx;
use crate::blockchain::types::{BlockchainError, BlockchainResult, Network};

/// Environment variable name for the key wallet's signing key.
pub const SIGNING_KEY_ENV_VAR: &str = "MINTER_WALLET_SIGNING_KEY";

/// cardano-cli wraps a 32-byte key in a CBOR byte string header.
const CLI_KEY_CBOR_PREFIX: &str = "5820";

/// A verification key witness over the transaction body hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VKeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

/// An enabled wallet able to report its address and sign transactions.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn network_id(&self) -> BlockchainResult<u8>;

    /// Address that receives change and minted tokens.
    async fn change_address(&self) -> BlockchainResult<Address>;

    async fn sign_tx(&self, tx: &UnsignedTx) -> BlockchainResult<Vec<VKeyWitness>>;
}

/// A wallet that can be enabled by identifier.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    fn name(&self) -> &str;

    async fn enable(&self) -> BlockchainResult<Arc<dyn WalletApi>>;
}

/// Wallet extensions addressable by identifier.
#[derive(Default, Clone)]
pub struct WalletRegistry {
    extensions: BTreeMap<String, Arc<dyn WalletExtension>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, extension: Arc<dyn WalletExtension>) {
        self.extensions.insert(id.into(), extension);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn WalletExtension>> {
        self.extensions.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for WalletRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.extensions.keys()).finish()
    }
}

/// Single-key wallet paying to an enterprise address.
pub struct KeyWallet {
    signing_key: SigningKey,
    network: Network,
    address: Address,
}

impl KeyWallet {
    /// Create a wallet from a hex signing key.
    ///
    /// Accepts the raw 32-byte key or the `cborHex` field of a cardano-cli
    /// `.skey` file.
    pub fn from_signing_key_hex(key_hex: &str, network: Network) -> BlockchainResult<Self> {
        let key_hex = key_hex.trim();
        let key_hex = if key_hex.len() == 68 {
            key_hex.strip_prefix(CLI_KEY_CBOR_PREFIX).unwrap_or(key_hex)
        } else {
            key_hex
        };
        let bytes = hex::decode(key_hex)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid signing key format: {}", e)))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            BlockchainError::Wallet("Invalid signing key format: expected 32 bytes".into())
        })?;
        Self::from_seed(seed, network)
    }

    /// Load wallet from environment variable.
    pub fn from_env(network: Network) -> BlockchainResult<Self> {
        let key = std::env::var(SIGNING_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                SIGNING_KEY_ENV_VAR
            ))
        })?;
        Self::from_signing_key_hex(&key, network)
    }

    /// Fresh random key; returns the wallet and its key hex.
    pub fn generate(network: Network) -> BlockchainResult<(Self, String)> {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let wallet = Self::from_seed(seed, network)?;
        Ok((wallet, hex::encode(seed)))
    }

    fn from_seed(seed: [u8; 32], network: Network) -> BlockchainResult<Self> {
        let signing_key = SigningKey::from_bytes(&seed);
        let key_hash = blake2b_224(&[&signing_key.verifying_key().to_bytes()[..]]);
        let address = Address::enterprise(network, key_hash)?;
        tracing::info!(address = %address, network = %network, "Key wallet initialized");
        Ok(Self {
            signing_key,
            network,
            address,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn verification_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign arbitrary bytes.
    pub fn sign(&self, message: &[u8]) -> VKeyWitness {
        VKeyWitness {
            vkey: self.verification_key(),
            signature: self.signing_key.sign(message).to_bytes(),
        }
    }
}

impl std::fmt::Debug for KeyWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyWallet")
            .field("address", &self.address.to_bech32())
            .field("network", &self.network)
            .finish()
    }
}

#[async_trait]
impl WalletApi for KeyWallet {
    async fn network_id(&self) -> BlockchainResult<u8> {
        Ok(self.network.network_id())
    }

    async fn change_address(&self) -> BlockchainResult<Address> {
        Ok(self.address.clone())
    }

    async fn sign_tx(&self, tx: &UnsignedTx) -> BlockchainResult<Vec<VKeyWitness>> {
        tracing::debug!(tx_hash = %tx.id(), "Signing transaction body");
        Ok(vec![self.sign(&tx.id().0)])
    }
}

enum KeySource {
    Env(String),
    Inline(String),
}

/// Extension that enables a [`KeyWallet`].
pub struct KeyWalletExtension {
    name: String,
    network: Network,
    source: KeySource,
}

impl KeyWalletExtension {
    /// Read the key from `env_var` each time the wallet is enabled.
    pub fn from_env(name: impl Into<String>, network: Network, env_var: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network,
            source: KeySource::Env(env_var.into()),
        }
    }

    pub fn from_key_hex(name: impl Into<String>, network: Network, key_hex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network,
            source: KeySource::Inline(key_hex.into()),
        }
    }
}

#[async_trait]
impl WalletExtension for KeyWalletExtension {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enable(&self) -> BlockchainResult<Arc<dyn WalletApi>> {
        let key = match &self.source {
            KeySource::Env(var) => std::env::var(var).map_err(|_| {
                BlockchainError::Wallet(format!("Environment variable {} not set", var))
            })?,
            KeySource::Inline(key) => key.clone(),
        };
        let wallet = KeyWallet::from_signing_key_hex(&key, self.network)?;
        Ok(Arc::new(wallet))
    }
}
