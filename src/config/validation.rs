//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check token metadata fits the on-chain limits (asset name, bounded bytes)
//! - Check the policy script decodes and matches a pinned policy id
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MinterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::blockchain::cip68::{self, MAX_ASSET_NAME_LEN};
use crate::blockchain::plutus::MAX_BOUNDED_BYTES;
use crate::blockchain::policy::MintingPolicy;
use crate::config::schema::MinterConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &MinterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if config.chain.request_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.request_timeout_secs", "must be greater than 0"));
    }
    if let Some(url) = &config.chain.provider_url {
        if url.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                "chain.provider_url",
                format!("'{}' is not a valid URL", url),
            ));
        }
    }

    let token = &config.token;
    if token.name.is_empty() {
        errors.push(ValidationError::new("token.name", "must not be empty"));
    } else if token.name.len() + 4 > MAX_ASSET_NAME_LEN {
        errors.push(ValidationError::new(
            "token.name",
            format!(
                "asset name would be {} bytes including the label, limit is {}",
                token.name.len() + 4,
                MAX_ASSET_NAME_LEN
            ),
        ));
    }
    if token.image.is_empty() {
        errors.push(ValidationError::new("token.image", "must not be empty"));
    } else if token.image.len() > MAX_BOUNDED_BYTES {
        errors.push(ValidationError::new(
            "token.image",
            format!(
                "{} bytes exceeds the {}-byte datum limit",
                token.image.len(),
                MAX_BOUNDED_BYTES
            ),
        ));
    }
    if u16::try_from(token.label).is_err() {
        errors.push(ValidationError::new("token.label", "must be below 65536"));
    } else if ![
        cip68::REFERENCE_NFT_LABEL,
        cip68::USER_NFT_LABEL,
        cip68::USER_FT_LABEL,
        cip68::USER_RFT_LABEL,
    ]
    .iter()
    .any(|l| u32::from(*l) == token.label)
    {
        tracing::warn!(label = token.label, "Token label is not a CIP-68 label");
    }

    if config.policy.script.is_empty() {
        errors.push(ValidationError::new("policy.script", "must be set"));
    } else {
        match MintingPolicy::from_hex(config.policy.script_type, &config.policy.script) {
            Ok(policy) => {
                if let Some(expected) = &config.policy.expected_policy_id {
                    let derived = policy.policy_id().to_string();
                    if !expected.eq_ignore_ascii_case(&derived) {
                        errors.push(ValidationError::new(
                            "policy.expected_policy_id",
                            format!("expected {} but script hashes to {}", expected, derived),
                        ));
                    }
                }
            }
            Err(e) => errors.push(ValidationError::new("policy.script", e.to_string())),
        }
    }

    match config.observability.log_format.as_str() {
        "text" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}', expected text or json", other),
        )),
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
