//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::MinterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `chain.network`.
pub const NETWORK_ENV_VAR: &str = "MINTER_NETWORK_ENV";
/// Supplies `chain.project_id`.
pub const PROJECT_ID_ENV_VAR: &str = "MINTER_BLOCKFROST_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "{}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, apply environment overrides and validate a TOML file.
pub fn load_config(path: &Path) -> Result<MinterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: MinterConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the `MINTER_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut MinterConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(network) = lookup(NETWORK_ENV_VAR) {
        config.chain.network = network.parse().map_err(|e: crate::blockchain::BlockchainError| {
            ConfigError::Env {
                var: NETWORK_ENV_VAR,
                message: e.to_string(),
            }
        })?;
    }
    if let Some(project_id) = lookup(PROJECT_ID_ENV_VAR) {
        config.chain.project_id = project_id.trim().to_string();
    }
    Ok(())
}
