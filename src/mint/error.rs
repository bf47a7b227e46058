//! Mint pipeline errors.

use thiserror::Error;

use crate::blockchain::BlockchainError;

/// Failure categories of a connect or mint attempt.
///
/// The `Display` output is the single user-visible error string.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("Wallet is not connected.")]
    NotConnected,

    #[error("A mint is already in progress.")]
    InProgress,

    #[error("Failed to connect wallet: {0}")]
    Connection(String),

    /// The selected wallet is unknown, cannot be enabled, or is on another network.
    #[error("Failed to connect wallet: {0}")]
    InvalidWallet(String),

    #[error("Failed to build transaction: {0}")]
    Build(#[source] BlockchainError),

    #[error("Failed to sign transaction: {0}")]
    Signing(#[source] BlockchainError),

    #[error("Failed to submit transaction: {0}")]
    Submit(#[source] BlockchainError),

    #[error("Mint task failed: {0}")]
    Task(String),
}

impl MintError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MintError::NotConnected => "not_connected",
            MintError::InProgress => "in_progress",
            MintError::Connection(_) => "connection",
            MintError::InvalidWallet(_) => "invalid_wallet",
            MintError::Build(_) => "build",
            MintError::Signing(_) => "signing",
            MintError::Submit(_) => "submit",
            MintError::Task(_) => "task",
        }
    }
}
