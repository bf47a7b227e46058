//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the minter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::blockchain::policy::ScriptType;
use crate::blockchain::types::Network;

/// Root configuration for the minter daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MinterConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Chain provider settings.
    pub chain: ChainConfig,

    /// Wallet selection.
    pub wallet: WalletConfig,

    /// Token metadata to mint.
    pub token: TokenConfig,

    /// Minting policy script.
    pub policy: PolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout in seconds. Must exceed a full mint round trip.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Chain provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Target network; `MINTER_NETWORK_ENV` overrides it.
    pub network: Network,

    /// Provider base URL. Derived from the network when unset.
    pub provider_url: Option<String>,

    /// Read-only fallbacks tried in order when the primary fails.
    pub failover_urls: Vec<String>,

    /// Blockfrost project id; normally supplied by `MINTER_BLOCKFROST_KEY`.
    #[serde(skip_serializing)]
    pub project_id: String,

    /// Per-call provider timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: Network::Preprod,
            provider_url: None,
            failover_urls: Vec::new(),
            project_id: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Wallet selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Identifier of the wallet enabled at startup; `None` leaves the
    /// minter disconnected.
    pub enabled: Option<String>,

    /// Identifier under which the key wallet is registered.
    pub key_wallet_id: String,

    /// Environment variable holding the key wallet's signing key.
    pub key_env_var: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            key_wallet_id: "local".to_string(),
            key_env_var: crate::blockchain::wallet::SIGNING_KEY_ENV_VAR.to_string(),
        }
    }
}

/// Token metadata for the CIP-68 reference datum.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub image: String,
    /// Metadata version, carried literally into the datum.
    pub version: u64,
    /// CIP-67 label of the minted asset.
    pub label: u32,
    /// Attach the metadata datum inline on the minted output.
    pub attach_datum: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Akyba".to_string(),
            image: "ipfs://QmU2hT2bRNZvzV6r3xzULiaiX5S6LPi2yGGvV3sXzgZHZH".to_string(),
            version: 1,
            label: u32::from(crate::blockchain::cip68::REFERENCE_NFT_LABEL),
            attach_datum: true,
        }
    }
}

/// Minting policy script.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    pub script_type: ScriptType,

    /// Compiled script as hex; single or double CBOR-wrapped.
    pub script: String,

    /// Refuse to start unless the derived policy id matches.
    pub expected_policy_id: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "text" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: MinterConfig = toml::from_str("").unwrap();
        assert_eq!(config.chain.network, Network::Preprod);
        assert_eq!(config.token.name, "Akyba");
        assert_eq!(config.token.version, 1);
        assert_eq!(config.token.label, 100);
        assert!(config.token.attach_datum);
        assert!(config.wallet.enabled.is_none());
        assert_eq!(config.policy.script_type, ScriptType::PlutusV3);
    }

    #[test]
    fn test_sections_parse() {
        let config: MinterConfig = toml::from_str(
            r#"
            [chain]
            network = "Mainnet"
            failover_urls = ["http://backup:3000"]

            [wallet]
            enabled = "local"

            [policy]
            script_type = "PlutusV2"
            script = "480100002221200101"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain.network, Network::Mainnet);
        assert_eq!(config.chain.failover_urls.len(), 1);
        assert_eq!(config.wallet.enabled.as_deref(), Some("local"));
        assert_eq!(config.policy.script_type, ScriptType::PlutusV2);
    }

    #[test]
    fn test_project_id_not_serialized() {
        let mut config = MinterConfig::default();
        config.chain.project_id = "preprodSECRET".into();
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("preprodSECRET"));
    }
}
