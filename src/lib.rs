//! CIP-68 NFT minter library.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mint;
pub mod observability;

pub use config::schema::MinterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mint::Minter;
