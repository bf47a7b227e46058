//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Connect wallet → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger → server drains → exit
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
