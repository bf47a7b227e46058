use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use cip68_minter::blockchain::{KeyWallet, MintingPolicy, Network};
use cip68_minter::config::load_config;
use cip68_minter::mint::MintRequest;

#[derive(Parser)]
#[command(name = "minter-cli")]
#[command(about = "Management CLI for the CIP-68 minter", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection and last mint outcome
    Status,
    /// Enable a wallet, or disconnect with --none
    Connect {
        wallet: Option<String>,
        #[arg(long, conflicts_with = "wallet")]
        none: bool,
    },
    /// Run one mint attempt
    Mint,
    /// Show the policy id, asset unit, datum and redeemer the daemon would mint
    Inspect,
    /// Derive the mint request from a config file without a daemon
    Derive {
        #[arg(short, long, default_value = "minter.toml")]
        config: PathBuf,
    },
    /// Generate a fresh signing key and print its enterprise address
    Keygen {
        #[arg(short, long, default_value = "Preprod")]
        network: Network,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/api/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Connect { wallet, none } => {
            if wallet.is_none() && !none {
                return Err("pass a wallet id or --none".into());
            }
            let res = client
                .post(format!("{}/api/wallet", cli.url))
                .json(&json!({ "wallet": wallet }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Mint => {
            let res = client.post(format!("{}/api/mint", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Inspect => {
            let res = client.get(format!("{}/api/request", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Derive { config } => {
            let config = load_config(&config)?;
            let policy = MintingPolicy::from_hex(config.policy.script_type, &config.policy.script)?;
            let view = MintRequest::build(&config.token, &policy)?.view()?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Keygen { network } => {
            let (wallet, key_hex) = KeyWallet::generate(network)?;
            let out = json!({
                "network": network.to_string(),
                "address": wallet.address().to_string(),
                "signing_key": key_hex,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: minter returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
