//! Wallet and chain client initialization.
//!
//! # Data Flow
//! ```text
//! enabled wallet id (or none)
//!     → BlockfrostClient handshake (protocol parameters)
//!     → WalletRegistry lookup → enable()
//!     → network id check → change address
//!     → ClientSession
//! ```
//!
//! A missing wallet id is not an error: no session is created and nothing
//! is contacted.

use std::sync::Arc;

use crate::blockchain::{
    Address, BlockchainError, BlockfrostClient, ChainProvider, Network, WalletApi, WalletRegistry,
};
use crate::config::ChainConfig;
use crate::mint::error::MintError;

/// A provider paired with an enabled wallet.
pub struct ClientSession {
    provider: Arc<dyn ChainProvider>,
    wallet: Arc<dyn WalletApi>,
    wallet_id: String,
    address: Address,
    network: Network,
}

impl ClientSession {
    pub fn provider(&self) -> Arc<dyn ChainProvider> {
        Arc::clone(&self.provider)
    }

    pub fn wallet(&self) -> &dyn WalletApi {
        self.wallet.as_ref()
    }

    pub fn wallet_id(&self) -> &str {
        &self.wallet_id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("wallet_id", &self.wallet_id)
            .field("address", &self.address.to_bech32())
            .field("network", &self.network)
            .finish()
    }
}

/// Initialize a session for the enabled wallet, if any.
///
/// Returns `Ok(None)` without touching the provider or the registry when
/// `wallet_id` is `None`.
pub async fn connect(
    config: &ChainConfig,
    wallet_id: Option<&str>,
    registry: &WalletRegistry,
) -> Result<Option<ClientSession>, MintError> {
    let Some(wallet_id) = wallet_id else {
        tracing::debug!("No wallet enabled; skipping client initialization");
        return Ok(None);
    };

    let provider = BlockfrostClient::new(config).map_err(|e| {
        tracing::error!(wallet = %wallet_id, error = %e, "Failed to connect wallet");
        MintError::Connection(e.to_string())
    })?;
    connect_with_provider(Arc::new(provider), config.network, wallet_id, registry)
        .await
        .map(Some)
}

/// Initialize a session against an already constructed provider.
pub async fn connect_with_provider(
    provider: Arc<dyn ChainProvider>,
    network: Network,
    wallet_id: &str,
    registry: &WalletRegistry,
) -> Result<ClientSession, MintError> {
    establish(provider, network, wallet_id, registry)
        .await
        .inspect_err(|e| {
            tracing::error!(wallet = %wallet_id, network = %network, error = %e, "Failed to connect wallet");
        })
        .map_err(|e| match e {
            BlockchainError::Wallet(_) | BlockchainError::NetworkMismatch { .. } => {
                MintError::InvalidWallet(e.to_string())
            }
            other => MintError::Connection(other.to_string()),
        })
}

async fn establish(
    provider: Arc<dyn ChainProvider>,
    network: Network,
    wallet_id: &str,
    registry: &WalletRegistry,
) -> Result<ClientSession, BlockchainError> {
    // Handshake: proves the endpoint and project id before the wallet is asked.
    provider.protocol_parameters().await?;

    let extension = registry
        .get(wallet_id)
        .ok_or_else(|| BlockchainError::Wallet(format!("unknown wallet '{}'", wallet_id)))?;
    let wallet = extension.enable().await?;

    let actual = wallet.network_id().await?;
    if actual != network.network_id() {
        return Err(BlockchainError::NetworkMismatch {
            expected: network.network_id(),
            actual,
        });
    }

    let address = wallet.change_address().await?;
    if address.network_id() != network.network_id() {
        return Err(BlockchainError::NetworkMismatch {
            expected: network.network_id(),
            actual: address.network_id(),
        });
    }

    tracing::info!(
        wallet = %wallet_id,
        extension = %extension.name(),
        address = %address,
        network = %network,
        "Wallet connected"
    );

    Ok(ClientSession {
        provider,
        wallet,
        wallet_id: wallet_id.to_string(),
        address,
        network,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testing::{test_wallet, MockProvider, TEST_SIGNING_KEY};
    use crate::blockchain::{KeyWalletExtension, WalletExtension};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExtension {
        inner: KeyWalletExtension,
        enabled: AtomicUsize,
    }

    impl CountingExtension {
        fn new(network: Network) -> Self {
            Self {
                inner: KeyWalletExtension::from_key_hex("counting", network, TEST_SIGNING_KEY),
                enabled: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WalletExtension for CountingExtension {
        fn name(&self) -> &str {
            "counting"
        }

        async fn enable(&self) -> crate::blockchain::BlockchainResult<Arc<dyn WalletApi>> {
            self.enabled.fetch_add(1, Ordering::SeqCst);
            self.inner.enable().await
        }
    }

    fn registry_with(extension: Arc<CountingExtension>) -> WalletRegistry {
        let mut registry = WalletRegistry::new();
        registry.register("counting", extension);
        registry
    }

    #[tokio::test]
    async fn test_no_wallet_means_no_session() {
        let extension = Arc::new(CountingExtension::new(Network::Preprod));
        let registry = registry_with(extension.clone());
        let config = ChainConfig {
            // unreachable: any handshake attempt would fail the test
            provider_url: Some("http://127.0.0.1:1".into()),
            ..Default::default()
        };

        let session = connect(&config, None, &registry).await.unwrap();
        assert!(session.is_none());
        assert_eq!(extension.enabled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connects_enabled_wallet() {
        let extension = Arc::new(CountingExtension::new(Network::Preprod));
        let registry = registry_with(extension.clone());
        let provider = Arc::new(MockProvider::with_utxos(vec![]));

        let session = connect_with_provider(provider.clone(), Network::Preprod, "counting", &registry)
            .await
            .unwrap();
        assert_eq!(session.wallet_id(), "counting");
        assert_eq!(session.address(), test_wallet(Network::Preprod).address());
        assert_eq!(provider.parameter_calls(), 1);
        assert_eq!(extension.enabled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handshake_failure_is_connection_error() {
        let extension = Arc::new(CountingExtension::new(Network::Preprod));
        let registry = registry_with(extension.clone());
        let mut provider = MockProvider::with_utxos(vec![]);
        provider.fail_parameters = true;

        let err = connect_with_provider(Arc::new(provider), Network::Preprod, "counting", &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, MintError::Connection(_)));
        assert!(err.to_string().starts_with("Failed to connect wallet: "));
        assert_eq!(extension.enabled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_wallet() {
        let registry = WalletRegistry::new();
        let err = connect_with_provider(
            Arc::new(MockProvider::with_utxos(vec![])),
            Network::Preprod,
            "eternl",
            &registry,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MintError::InvalidWallet(_)));
        assert!(err.to_string().contains("unknown wallet 'eternl'"));
    }

    #[tokio::test]
    async fn test_network_mismatch_rejected() {
        let extension = Arc::new(CountingExtension::new(Network::Mainnet));
        let registry = registry_with(extension);
        let err = connect_with_provider(
            Arc::new(MockProvider::with_utxos(vec![])),
            Network::Preprod,
            "counting",
            &registry,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MintError::InvalidWallet(_)));
        assert!(err.to_string().contains("Network mismatch"), "{}", err);
    }
}
