//! Metrics collection and exposition.
//!
//! # Metrics
//! - `minter_mint_attempts_total` (counter): mint attempts by outcome
//! - `minter_mint_duration_seconds` (histogram): build, sign and submit latency
//! - `minter_provider_requests_total` (counter): provider calls by endpoint, status
//! - `minter_provider_request_duration_seconds` (histogram): provider latency by endpoint
//! - `minter_provider_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `minter_wallet_connected` (gauge): 1 while a wallet session exists
//!
//! Status `0` marks a provider call that never got a response.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one provider round trip.
pub fn record_provider_request(endpoint: &'static str, status: u16, started: Instant) {
    ::metrics::counter!(
        "minter_provider_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("minter_provider_request_duration_seconds", "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_provider_health(healthy: bool) {
    ::metrics::gauge!("minter_provider_healthy").set(if healthy { 1.0 } else { 0.0 });
}

/// Record a finished mint attempt; `outcome` is a short static label.
pub fn record_mint(outcome: &'static str, started: Instant) {
    ::metrics::counter!("minter_mint_attempts_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("minter_mint_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn set_wallet_connected(connected: bool) {
    ::metrics::gauge!("minter_wallet_connected").set(if connected { 1.0 } else { 0.0 });
}
