//! `entitlement-sync` command-line entry point.
//!
//! Thin shell over `EntitlementRuntime` for checking and changing this
//! installation's subscription from a terminal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use entitlement_sync::application::EntitlementRuntime;
use entitlement_sync::config::{AppConfig, LogFormat};
use entitlement_sync::domain::entitlement::{AccessGate, CheckoutOutcome, EntitlementView};

#[derive(Parser, Debug)]
#[command(name = "entitlement-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Override the subscription backend base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Override the identity file location
    #[arg(long)]
    identity_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print this installation's client identity
    Identity,

    /// Fetch and print the current entitlement
    Status,

    /// Start a checkout and wait for it to complete
    Checkout {
        /// Print the checkout URL and exit without polling
        #[arg(long)]
        no_wait: bool,
    },

    /// Cancel the active subscription
    Cancel,

    /// Activate through the backend's test bypass
    #[cfg(feature = "dev-activate")]
    DevActivate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    if let Some(path) = cli.identity_path {
        config.storage.identity_path = Some(path);
    }

    init_tracing(&config);

    let runtime =
        EntitlementRuntime::from_config(&config).context("failed to build entitlement runtime")?;
    let result = run(&runtime, cli.command).await;
    runtime.shutdown();
    result
}

async fn run(runtime: &EntitlementRuntime, command: Commands) -> Result<()> {
    let machine = runtime.machine();
    let coordinator = runtime.coordinator();

    match command {
        Commands::Identity => {
            let identity = machine.identity().await?;
            println!("{}", identity);
        }
        Commands::Status => {
            machine.refresh().await?;
            print_view(&machine.current_state());
        }
        Commands::Checkout { no_wait } => {
            machine.refresh().await?;
            if machine.current_state().is_subscribed() {
                println!("Already subscribed");
                return Ok(());
            }

            let url = coordinator.begin_checkout().await?;
            println!("Complete checkout in your browser:\n  {}", url);
            if no_wait {
                println!("Run `entitlement-sync status` once payment is done.");
                return Ok(());
            }

            let session = coordinator
                .active_session()
                .context("checkout session disappeared before polling")?;
            println!("Waiting for confirmation (Ctrl-C to stop)...");

            let outcome = tokio::select! {
                outcome = coordinator.await_completion(&session.session_id) => outcome,
                _ = tokio::signal::ctrl_c() => {
                    coordinator.cancel_polling();
                    CheckoutOutcome::StillPending
                }
            };
            report_outcome(&outcome)?;
            print_view(&machine.current_state());
        }
        Commands::Cancel => {
            machine.refresh().await?;
            let snapshot = coordinator.cancel().await?;
            println!("Subscription is now {}", snapshot.status());
        }
        #[cfg(feature = "dev-activate")]
        Commands::DevActivate => {
            let snapshot = coordinator.dev_activate().await?;
            println!("Subscription is now {}", snapshot.status());
        }
    }

    Ok(())
}

fn report_outcome(outcome: &CheckoutOutcome) -> Result<()> {
    match outcome {
        CheckoutOutcome::Activated => println!("Subscription activated."),
        CheckoutOutcome::StillPending => {
            println!("Stopped waiting. If payment completes, `status` will pick it up.")
        }
        CheckoutOutcome::TimedOut => {
            println!("Still not confirmed. Check again later with `status`.")
        }
        CheckoutOutcome::Failed { reason } => anyhow::bail!("checkout polling failed: {}", reason),
    }
    Ok(())
}

fn print_view(view: &EntitlementView) {
    println!("state:      {}", view.state);
    match &view.snapshot {
        Some(snapshot) => {
            println!("status:     {}", snapshot.status());
            println!("fetched_at: {}", snapshot.fetched_at());
        }
        None => println!("status:     unknown"),
    }
    println!("access:     {}", AccessGate::for_view(view));
}

/// Logs go to stderr so stdout stays clean for command output.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
