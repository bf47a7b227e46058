//! Cardano chain integration.
//!
//! # Data Flow
//! ```text
//! TokenConfig + MintingPolicy
//!     → cip68.rs / plutus.rs (asset name, reference datum)
//!     → transaction.rs (select inputs, evaluate, balance)
//!     → wallet.rs (sign body hash)
//!     → client.rs (submit through Blockfrost)
//! ```
//!
//! # Security Constraints
//! - Signing keys ONLY from environment variables
//! - Never log keys or project ids
//! - Every provider call has a configurable timeout

pub mod address;
pub mod cbor;
pub mod cip68;
pub mod client;
pub mod hash;
pub mod plutus;
pub mod policy;
pub mod transaction;
pub mod types;
pub mod value;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use address::Address;
pub use client::{BlockfrostClient, ChainProvider, RedeemerBudget};
pub use plutus::PlutusData;
pub use policy::{MintingPolicy, ScriptType};
pub use transaction::{MintPlan, SignedTx, TxBuilder, UnsignedTx};
pub use types::{BlockchainError, BlockchainResult, Network, PolicyId, ProtocolParameters, TxHash};
pub use value::{TxInput, TxOutput, Utxo, Value};
pub use wallet::{KeyWallet, KeyWalletExtension, WalletApi, WalletExtension, WalletRegistry};
