//! Command-line entry point for **update-route53**
//!
//! * Parses `--config`, `--port` and `--console` (each with an env fallback)  
//! * Sets up tracing: JSON lines by default, compact text with `--console`  
//! * Turns SIGINT / SIGTERM into a shutdown trigger  
//! * Boots the core logic defined in `ddns_core`

use anyhow::Result;
use clap::Parser;
use ddns_core::{bootstrap, load_config, shutdown};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the config file (optional; environment variables are used if absent)
    #[arg(short, long, env = "DDNS_CONFIG", default_value = "update-route53.toml")]
    config: String,

    /// Port for the health check / metrics server
    #[arg(short, long, env = "DDNS_PORT")]
    port: Option<u16>,

    /// Human-readable console logging instead of JSON
    #[arg(long, env = "DDNS_CONSOLE")]
    console: bool,
}

fn init_tracing(console: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if console {
        registry.with(fmt::layer().compact()).init();
    } else {
        registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .init();
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("SIGINT")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.console);

    let cfg = load_config(&cli.config, cli.port)?;

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(sig) => info!("received {sig}"),
            Err(e) => tracing::error!("signal handler failed: {e}"),
        }
        trigger.trigger();
    });

    bootstrap(cfg, shutdown).await
}
