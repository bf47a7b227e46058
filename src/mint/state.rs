//! Display state shared between the mint pipeline and the status page.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::blockchain::{Network, TxHash};
use crate::mint::error::MintError;

#[derive(Debug, Default)]
struct Outcome {
    tx_hash: Option<TxHash>,
    error: Option<String>,
}

/// Loading flag plus the most recent outcome.
///
/// At most one mint runs at a time: [`MintState::begin`] flips the loading
/// flag atomically and the returned guard clears it on drop.
#[derive(Debug, Default)]
pub struct MintState {
    loading: AtomicBool,
    outcome: RwLock<Outcome>,
}

/// Clears the loading flag when dropped.
#[derive(Debug)]
pub struct MintGuard<'a> {
    state: &'a MintState,
}

impl Drop for MintGuard<'_> {
    fn drop(&mut self) {
        self.state.loading.store(false, Ordering::Release);
    }
}

impl MintState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an attempt. The previous hash and error are cleared so the
    /// page shows only the loading state until this attempt resolves.
    pub fn begin(&self) -> Result<MintGuard<'_>, MintError> {
        self.loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MintError::InProgress)?;
        *self.outcome.write().unwrap_or_else(PoisonError::into_inner) = Outcome::default();
        Ok(MintGuard { state: self })
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// A successful mint replaces any earlier error.
    pub fn record_success(&self, tx_hash: TxHash) {
        let mut outcome = self.outcome.write().unwrap_or_else(PoisonError::into_inner);
        outcome.tx_hash = Some(tx_hash);
        outcome.error = None;
    }

    /// A failed mint replaces any earlier hash and error.
    pub fn record_failure(&self, error: &MintError) {
        let mut outcome = self.outcome.write().unwrap_or_else(PoisonError::into_inner);
        outcome.tx_hash = None;
        outcome.error = Some(error.to_string());
    }

    /// Surface an error that is not a mint outcome, such as a failed connect.
    pub fn set_error(&self, error: &MintError) {
        self.outcome.write().unwrap_or_else(PoisonError::into_inner).error = Some(error.to_string());
    }

    pub fn clear_error(&self) {
        self.outcome.write().unwrap_or_else(PoisonError::into_inner).error = None;
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.outcome.read().unwrap_or_else(PoisonError::into_inner).tx_hash
    }

    pub fn error(&self) -> Option<String> {
        self.outcome.read().unwrap_or_else(PoisonError::into_inner).error.clone()
    }
}

/// Snapshot rendered by the status page and `/api/status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusView {
    pub network: String,
    pub connected: bool,
    pub wallet: Option<String>,
    pub address: Option<String>,
    pub loading: bool,
    pub tx_hash: Option<String>,
    pub explorer_url: Option<String>,
    pub error: Option<String>,
}

impl StatusView {
    pub fn new(
        network: Network,
        session: Option<(&str, String)>,
        state: &MintState,
    ) -> Self {
        let tx_hash = state.tx_hash();
        let (wallet, address) = match session {
            Some((wallet, address)) => (Some(wallet.to_string()), Some(address)),
            None => (None, None),
        };
        Self {
            network: network.to_string(),
            connected: address.is_some(),
            wallet,
            address,
            loading: state.is_loading(),
            tx_hash: tx_hash.map(|h| h.to_string()),
            explorer_url: tx_hash.map(|h| network.explorer_tx_url(&h)),
            error: state.error(),
        }
    }
}
