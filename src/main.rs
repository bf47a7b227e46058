//! CIP-68 NFT minter daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                   MINTER                        │
//!                    │                                                 │
//!   Browser / CLI    │  ┌────────┐    ┌──────────┐    ┌────────────┐   │
//!   ─────────────────┼─▶│  http  │───▶│   mint   │───▶│ blockchain │───┼──▶ Blockfrost
//!                    │  │ server │    │ session  │    │  tx build  │   │
//!   ◀────────────────┼──│  page  │◀───│ submitter│◀───│  wallets   │◀──┼───
//!                    │  └────────┘    └──────────┘    └────────────┘   │
//!                    │                                                 │
//!                    │  ┌────────┐  ┌──────────────┐  ┌────────────┐   │
//!                    │  │ config │  │observability │  │ lifecycle  │   │
//!                    │  └────────┘  └──────────────┘  └────────────┘   │
//!                    └────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use cip68_minter::blockchain::{KeyWalletExtension, WalletRegistry};
use cip68_minter::config::load_config;
use cip68_minter::lifecycle::{wait_for_signal, Shutdown};
use cip68_minter::observability::{logging, metrics};
use cip68_minter::{HttpServer, Minter};

#[derive(Parser)]
#[command(name = "cip68-minter", about = "Mint CIP-68 NFTs through Blockfrost")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "minter.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!("cip68-minter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %args.config.display(),
        network = %config.chain.network,
        bind_address = %config.server.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut registry = WalletRegistry::new();
    registry.register(
        config.wallet.key_wallet_id.clone(),
        Arc::new(KeyWalletExtension::from_env(
            config.wallet.key_wallet_id.clone(),
            config.chain.network,
            config.wallet.key_env_var.clone(),
        )),
    );

    let minter = Arc::new(Minter::new(&config, registry)?);
    // A failed connect is shown on the page; the daemon keeps serving.
    if let Err(e) = minter.connect_wallet(config.wallet.enabled.as_deref()).await {
        tracing::warn!(error = %e, "Starting without a wallet session");
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(
        minter,
        Duration::from_secs(config.server.request_timeout_secs),
    );
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
