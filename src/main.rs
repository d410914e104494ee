//! `gm-staking` command line entrypoint.
//!
//! Commands:
//! - `networks` – List the configured networks
//! - `symbol` – Native symbol of the network the wallet is connected to
//! - `position [--address]` – Aggregated staking position, as JSON
//! - `balance [--address]` – Native balance on the connected network
//! - `stake <amount>` – Stake native asset for gm tokens
//! - `restake <amount>` – Approve (when needed) and restake gm tokens
//! - `watch [--address] [--interval-seconds]` – Poll the position until Ctrl-C/SIGTERM
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `EVM_PRIVATE_KEY`, `RPC_URL` select the wallet
//! - `CONFIG_FILE` points at the TOML config (default `gm-staking.toml`)
//! - `RUST_LOG` controls log verbosity

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

use gm_staking::config::StakingConfig;
use gm_staking::sig_down::SigDown;
use gm_staking::telemetry::Telemetry;
use gm_staking::{
    ContractGateway, NetworkRegistry, PositionAggregator, PositionPoller, RpcWallet,
    TransactionOrchestrator, TransactionResult, WalletProvider,
};

/// Stake a chain's native asset for gm tokens and restake them.
#[derive(Parser, Debug)]
#[command(name = "gm-staking", version)]
struct Cli {
    /// Hex private key of the signing account
    #[arg(long, env = "EVM_PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    /// JSON-RPC endpoint; defaults to the `--network` profile's endpoint
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Configured network key, e.g. `bob-sepolia`
    #[arg(long, global = true)]
    network: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured networks
    Networks,
    /// Print the connected network's native symbol
    Symbol,
    /// Print the staking position as JSON
    Position {
        /// Account to inspect (defaults to the signer)
        #[arg(long)]
        address: Option<Address>,
    },
    /// Print the native balance on the connected network
    Balance {
        /// Account to inspect (defaults to the signer)
        #[arg(long)]
        address: Option<Address>,
    },
    /// Stake native asset, e.g. `stake 0.5`
    Stake { amount: String },
    /// Restake gm tokens, approving the staking contract first when needed
    Restake { amount: String },
    /// Poll the staking position until interrupted
    Watch {
        /// Account to inspect (defaults to the signer)
        #[arg(long)]
        address: Option<Address>,
        /// Overrides `[polling] interval_seconds`
        #[arg(long)]
        interval_seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = StakingConfig::from_env().context("failed to load configuration")?;
    let registry = Arc::new(NetworkRegistry::from_config(&config)?);

    if let Command::Networks = cli.command {
        print_networks(&registry);
        return Ok(());
    }

    let rpc_url = match (&cli.rpc_url, &cli.network) {
        (Some(url), _) => Some(url.clone()),
        (None, Some(key)) => {
            let profile = registry
                .by_key(key)
                .with_context(|| format!("unknown network '{key}'"))?;
            profile.rpc_url.clone()
        }
        (None, None) => None,
    };
    let wallet = RpcWallet::from_credentials(
        cli.private_key.as_deref(),
        rpc_url.as_deref(),
        config.rpc.timeout(),
    )?
    .map(|w| Arc::new(w) as Arc<dyn WalletProvider>);

    let gateway = Arc::new(ContractGateway::new(wallet, Arc::clone(&registry)));
    let aggregator = Arc::new(PositionAggregator::new(Arc::clone(&gateway)));

    match cli.command {
        Command::Networks => unreachable!("handled before connecting"),
        Command::Symbol => {
            println!("{}", aggregator.network_symbol().await?);
        }
        Command::Position { address } => {
            let user = account_or_signer(&aggregator, address).await?;
            let position = aggregator.get_position(user).await?;
            println!("{}", serde_json::to_string_pretty(&position)?);
        }
        Command::Balance { address } => {
            let user = account_or_signer(&aggregator, address).await?;
            let network = aggregator.current_network().await?;
            let balance = aggregator.native_balance(user).await?;
            println!("{balance} {}", network.native_symbol);
        }
        Command::Stake { amount } => {
            let orchestrator = TransactionOrchestrator::new(gateway, config.transaction.gas_limit);
            let result = orchestrator.stake(&amount).await?;
            report(&aggregator, &result).await?;
        }
        Command::Restake { amount } => {
            let orchestrator = TransactionOrchestrator::new(gateway, config.transaction.gas_limit);
            let result = orchestrator.restake(&amount).await?;
            report(&aggregator, &result).await?;
        }
        Command::Watch {
            address,
            interval_seconds,
        } => {
            let user = account_or_signer(&aggregator, address).await?;
            let period = interval_seconds
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or_else(|| config.polling.interval());
            watch(aggregator, user, period).await?;
        }
    }

    Ok(())
}

fn print_networks(registry: &NetworkRegistry) {
    for profile in registry.profiles() {
        println!(
            "{:<20} {:>10} ({}) {:<14} {} staking={} {}={}",
            profile.key,
            profile.chain_id.to_string(),
            profile.hex_chain_id(),
            profile.display_name,
            profile.native_symbol,
            profile.staking_contract,
            profile.derivative_symbol(),
            profile.derivative_token_contract,
        );
    }
}

async fn account_or_signer(
    aggregator: &PositionAggregator,
    address: Option<Address>,
) -> Result<Address> {
    match address {
        Some(address) => Ok(address),
        None => Ok(aggregator.account().await?),
    }
}

async fn report(aggregator: &PositionAggregator, result: &TransactionResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    let network = aggregator.current_network().await?;
    if let Some(url) = network.explorer_tx_url(result.transaction_hash) {
        println!("{url}");
    }
    Ok(())
}

async fn watch(aggregator: Arc<PositionAggregator>, user: Address, period: Duration) -> Result<()> {
    let sig_down = SigDown::try_new()?;
    let shutdown = sig_down.cancellation_token();
    let poller = PositionPoller::spawn(aggregator, user, period, &shutdown);
    let mut updates = poller.subscribe();

    tracing::info!(%user, period_secs = period.as_secs(), "watching position");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let state = updates.borrow_and_update().clone();
        match (&state.last_error, &state.position) {
            (Some(error), _) => eprintln!("poll failed: {error}"),
            (None, Some(position)) => println!("{}", serde_json::to_string(position)?),
            (None, None) => {}
        }
    }

    poller.join().await;
    Ok(())
}
