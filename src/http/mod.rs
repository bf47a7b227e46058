//! HTTP interface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID, trace span)
//!     → server.rs (routes: page + JSON API)
//!     → Minter (status, connect, mint)
//!     → page.rs / response.rs (HTML, JSON, error mapping)
//! ```

pub mod page;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
