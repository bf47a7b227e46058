//! CIP-68 minting subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/wallet ──▶ session.rs (connect) ──▶ Minter.session
//!
//! POST /api/mint ──▶ spawned attempt task
//!     → session check (not connected: error only)
//!     → MintState::begin (reject while in flight, clear last outcome)
//!     → request.rs (datum, redeemer, asset unit)
//!     → submitter.rs (build, sign, submit)
//!     → MintState (tx hash or error)
//! ```
//!
//! # Design Decisions
//! - One mint at a time, enforced atomically
//! - An attempt outlives the request that started it
//! - The session is replaced wholesale on reconnect, never mutated
//! - Outcomes live in memory only

pub mod error;
pub mod request;
pub mod session;
pub mod state;
pub mod submitter;

pub use error::MintError;
pub use request::{MintRequest, RequestView};
pub use session::ClientSession;
pub use state::{MintState, StatusView};
pub use submitter::Submitter;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::{BlockchainResult, MintingPolicy, Network, TxHash, WalletRegistry};
use crate::config::{ChainConfig, MinterConfig, TokenConfig};
use crate::observability::metrics;

/// Owns the session, the policy and the display state.
pub struct Minter {
    chain: ChainConfig,
    token: TokenConfig,
    policy: MintingPolicy,
    registry: WalletRegistry,
    submitter: Submitter,
    session: RwLock<Option<Arc<ClientSession>>>,
    state: MintState,
}

impl Minter {
    pub fn new(config: &MinterConfig, registry: WalletRegistry) -> BlockchainResult<Self> {
        let policy = MintingPolicy::from_hex(config.policy.script_type, &config.policy.script)?;
        tracing::info!(
            policy_id = %policy.policy_id(),
            script_type = %policy.script_type(),
            "Minting policy loaded"
        );
        Ok(Self {
            chain: config.chain.clone(),
            token: config.token.clone(),
            policy,
            registry,
            submitter: Submitter::new(config.token.attach_datum),
            session: RwLock::new(None),
            state: MintState::new(),
        })
    }

    pub fn network(&self) -> Network {
        self.chain.network
    }

    pub fn policy(&self) -> &MintingPolicy {
        &self.policy
    }

    pub fn state(&self) -> &MintState {
        &self.state
    }

    pub fn wallet_ids(&self) -> Vec<String> {
        self.registry.ids().map(str::to_string).collect()
    }

    /// The request the next mint would submit.
    pub fn request(&self) -> BlockchainResult<MintRequest> {
        MintRequest::build(&self.token, &self.policy)
    }

    pub async fn session(&self) -> Option<Arc<ClientSession>> {
        self.session.read().await.clone()
    }

    /// Replace the current session.
    pub async fn install_session(&self, session: Option<ClientSession>) {
        let connected = session.is_some();
        *self.session.write().await = session.map(Arc::new);
        metrics::set_wallet_connected(connected);
    }

    /// Connect the wallet `wallet_id`, or disconnect when `None`.
    ///
    /// On failure the session is cleared and the error is kept for display.
    pub async fn connect_wallet(&self, wallet_id: Option<&str>) -> Result<bool, MintError> {
        match session::connect(&self.chain, wallet_id, &self.registry).await {
            Ok(session) => {
                let connected = session.is_some();
                self.install_session(session).await;
                self.state.clear_error();
                Ok(connected)
            }
            Err(e) => {
                self.install_session(None).await;
                self.state.set_error(&e);
                Err(e)
            }
        }
    }

    /// Run one mint attempt and record its outcome.
    ///
    /// The attempt runs on its own task, so dropping the returned future
    /// (a request timeout or a closed connection) does not abandon a
    /// transaction that may already be on its way to the node.
    pub async fn mint(self: &Arc<Self>) -> Result<TxHash, MintError> {
        let minter = Arc::clone(self);
        tokio::spawn(async move { minter.run_attempt().await })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Mint task aborted");
                MintError::Task(e.to_string())
            })?
    }

    async fn run_attempt(&self) -> Result<TxHash, MintError> {
        let Some(session) = self.session().await else {
            let err = MintError::NotConnected;
            tracing::warn!(error = %err, "Mint requested without a wallet");
            self.state.set_error(&err);
            return Err(err);
        };

        let _guard = self.state.begin()?;
        let started = Instant::now();
        let attempt = Uuid::new_v4();

        let result = self
            .attempt(&session)
            .instrument(tracing::info_span!("mint", attempt = %attempt))
            .await;

        match &result {
            Ok(tx_hash) => {
                self.state.record_success(*tx_hash);
                metrics::record_mint("success", started);
            }
            Err(e) => {
                tracing::error!(attempt = %attempt, error = %e, "Mint failed");
                self.state.record_failure(e);
                metrics::record_mint(e.kind(), started);
            }
        }
        result
    }

    async fn attempt(&self, session: &ClientSession) -> Result<TxHash, MintError> {
        let request = self.request().map_err(MintError::Build)?;
        self.submitter
            .submit(Some(session), &request, &self.policy)
            .await
    }

    pub async fn status(&self) -> StatusView {
        let session = self.session().await;
        StatusView::new(
            self.network(),
            session
                .as_deref()
                .map(|s| (s.wallet_id(), s.address().to_string())),
            &self.state,
        )
    }
}
