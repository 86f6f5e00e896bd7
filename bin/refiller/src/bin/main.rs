//! Refill CLI.
//!
//! - `initiate`: submit a refill trigger and follow it to completion
//! - `watch`: resume tracking of a persisted refill
//! - `status`: print the persisted refill state
//! - `dismiss`: return a finished refill to idle

use clap::{Parser, Subcommand};
use monitor::{
    detect::ccip_message_url, ChainReader, InitiateOutcome, Notifiers, RefillMonitor,
    TracingNotifier,
};
use refiller::{
    build_initiator, build_monitor, config::Config, metrics::Metrics, open_store,
    wait_for_settlement,
};
use std::sync::Arc;
use store::{RefillRequest, Status};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "refiller")]
#[command(about = "Trigger and follow cross-chain faucet refills")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a refill trigger and follow it until it settles
    Initiate {
        /// Private key for signing the trigger (hex string, with or without 0x prefix)
        #[arg(short = 'k', long, env = "PRIVATE_KEY")]
        private_key: String,

        /// Return once the trigger is submitted instead of following it
        #[arg(long)]
        detach: bool,
    },

    /// Resume tracking of a persisted refill
    Watch,

    /// Print the persisted refill state as JSON
    Status,

    /// Return a finished refill to idle
    Dismiss {
        /// Also reset a refill that is still running
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_file(&cli.config)?;
    let store = open_store(&config)?;

    info!("Loaded config:");
    info!("  Network: {:?}", config.network);
    info!("  Faucet: {}", config.faucet_address);
    info!("  Helper: {}", config.helper_address);
    info!("  State file: {}", config.state_file.display());

    match cli.command {
        Command::Status => {
            let request = store.get();
            println!("{}", serde_json::to_string_pretty(&request)?);
            print_tracking_urls(&config, &request);
        }
        Command::Dismiss { force } => {
            let request = store.get();
            if request.is_running() && !force {
                eyre::bail!("Refill is still running; pass --force to reset it anyway");
            }
            store.reset()?;
            info!(previous = ?request.status, "Refill dismissed");
        }
        Command::Watch => {
            let metrics = install_metrics(&config)?;
            let notifier = Notifiers::new()
                .with(Arc::new(TracingNotifier))
                .with(Arc::new(metrics.clone()));
            let monitor = build_monitor(&config, store, Arc::new(notifier)).await?;

            let outcome = monitor.resume().await;
            info!(?outcome, "Startup reconciliation finished");

            follow(&monitor, &metrics).await;
        }
        Command::Initiate {
            private_key,
            detach,
        } => {
            let metrics = install_metrics(&config)?;
            let notifier = Notifiers::new()
                .with(Arc::new(TracingNotifier))
                .with(Arc::new(metrics.clone()));
            let monitor = build_monitor(&config, store, Arc::new(notifier)).await?;

            // correct a stale record before deciding whether we may initiate
            monitor.resume().await;

            let initiator = build_initiator(&config, monitor.clone(), &private_key)?;
            match initiator.initiate().await? {
                InitiateOutcome::Submitted(tx_hash) => {
                    info!(tx_hash = %tx_hash, "Refill submitted");
                }
                InitiateOutcome::AlreadyRunning => {
                    warn!("A refill is already running, following it instead");
                }
                InitiateOutcome::AwaitingDismissal(status) => {
                    eyre::bail!(
                        "Previous refill ended with status {:?}; run `refiller dismiss` first",
                        status
                    );
                }
            }

            if detach {
                monitor.stop();
                info!("Detached; run `refiller watch` to keep tracking");
                return Ok(());
            }

            follow(&monitor, &metrics).await;
        }
    }

    Ok(())
}

fn install_metrics(config: &Config) -> eyre::Result<Metrics> {
    if let Some(port) = config.metrics_port {
        refiller::metrics::install_prometheus_exporter(port)?;
        info!(port, "Prometheus exporter listening");
    }

    Ok(Metrics::new())
}

/// Follow the request until it settles or the user interrupts.
async fn follow<A, H>(monitor: &RefillMonitor<A, H>, metrics: &Metrics)
where
    A: ChainReader,
    H: ChainReader,
{
    let settled = wait_for_settlement(monitor, |request| {
        metrics.set_request(request);
        info!(
            status = ?request.status,
            phase = %request.current_phase,
            progress = request.progress,
            "Refill state"
        );
    });

    tokio::select! {
        request = settled => report(&request),
        _ = tokio::signal::ctrl_c() => {
            monitor.stop();
            info!("Interrupted; state kept, run `refiller watch` to resume");
        }
    }
}

fn report(request: &RefillRequest) {
    match request.status {
        Status::Success => info!("Reservoir refilled"),
        Status::Failed => warn!(
            error = request.error_message.as_deref().unwrap_or("unknown"),
            "Refill failed; run `refiller dismiss` to clear it"
        ),
        Status::Idle => info!("No refill in progress"),
        Status::Running => {}
    }
}

fn print_tracking_urls(config: &Config, request: &RefillRequest) {
    if let Some(id) = request.outbound_message_id {
        println!("outbound: {}", ccip_message_url(&config.ccip_explorer_url, id));
    }
    if let Some(id) = request.response_message_id {
        println!("response: {}", ccip_message_url(&config.ccip_explorer_url, id));
    }
}
