//! Build, sign and submit a mint transaction.
//!
//! # Data Flow
//! ```text
//! ClientSession + MintRequest + MintingPolicy
//!     → TxBuilder::build_mint   (MintError::Build)
//!     → WalletApi::sign_tx      (MintError::Signing)
//!     → ChainProvider::submit   (MintError::Submit)
//!     → TxHash
//! ```
//!
//! One attempt per call. Nothing is retried or rolled back.

use crate::blockchain::{BlockchainError, MintPlan, MintingPolicy, TxBuilder, TxHash};
use crate::mint::error::MintError;
use crate::mint::request::MintRequest;
use crate::mint::session::ClientSession;

/// Quantity minted per attempt.
pub const MINT_QUANTITY: u64 = 1;

#[derive(Debug, Clone, Copy)]
pub struct Submitter {
    attach_datum: bool,
}

impl Submitter {
    /// `attach_datum` puts the metadata datum inline on the minted output.
    pub fn new(attach_datum: bool) -> Self {
        Self { attach_datum }
    }

    pub async fn submit(
        &self,
        session: Option<&ClientSession>,
        request: &MintRequest,
        policy: &MintingPolicy,
    ) -> Result<TxHash, MintError> {
        let session = session.ok_or(MintError::NotConnected)?;

        if request.policy_id != policy.policy_id() {
            return Err(MintError::Build(BlockchainError::Build(format!(
                "request was built for policy {}, not {}",
                request.policy_id,
                policy.policy_id()
            ))));
        }

        let plan = MintPlan {
            policy: policy.clone(),
            asset_name: request.asset_name.clone(),
            quantity: MINT_QUANTITY,
            redeemer: request.redeemer.clone(),
            recipient: session.address().clone(),
            inline_datum: self.attach_datum.then(|| request.datum.clone()),
        };

        let provider = session.provider();
        let unsigned = TxBuilder::new(provider.clone())
            .build_mint(&plan, session.address())
            .await
            .map_err(MintError::Build)?;

        let witnesses = session
            .wallet()
            .sign_tx(&unsigned)
            .await
            .map_err(MintError::Signing)?;
        let signed = unsigned.assemble(witnesses).map_err(MintError::Signing)?;

        let tx_hash = provider
            .submit_tx(signed.as_bytes())
            .await
            .map_err(MintError::Submit)?;
        if tx_hash != signed.id() {
            tracing::warn!(
                submitted = %tx_hash,
                computed = %signed.id(),
                "Provider reported a different transaction hash"
            );
        }

        tracing::info!(
            tx_hash = %tx_hash,
            unit = %request.unit,
            wallet = %session.wallet_id(),
            "Mint transaction submitted"
        );
        Ok(tx_hash)
    }
}
