//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! minter.toml
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (MINTER_NETWORK_ENV / MINTER_BLOCKFROST_KEY overrides)
//!     → validation.rs (semantic checks)
//!     → MinterConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment, never from the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ChainConfig, MinterConfig, ObservabilityConfig, PolicyConfig, ServerConfig, TokenConfig,
    WalletConfig,
};
pub use validation::{validate_config, ValidationError};
