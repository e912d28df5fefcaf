use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use ts_status_stats::ts_status_stats_config::{Config, FileConfig};
use ts_status_stats::{init_tracing, run, Collector};

/// Collect Tailscale status snapshots into daily Parquet files
#[derive(Parser)]
#[command(name = "ts-status-stats")]
#[command(version)]
#[command(about = "Collect Tailscale status snapshots into daily Parquet files", long_about = None)]
struct Cli {
    /// Path to configuration file (default: ~/.config/ts-status.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Polling interval in seconds (overrides config file)
    #[arg(short, long, value_name = "SECONDS")]
    interval: Option<i64>,

    /// Root directory for Parquet files (overrides config file)
    #[arg(short = 'o', long, value_name = "DIR")]
    base_location: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Collect a single snapshot and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli).context("Configuration error")?;

    info!(
        interval_secs = config.interval_secs,
        base_location = %config.base_location.display(),
        file_name_format = %config.file_name_format,
        "Configuration loaded"
    );

    let collector = Collector::from_config(&config)?;

    if cli.once {
        let path = collector.run_once()?;
        info!("Status saved to {}", path.display());
        return Ok(());
    }

    // One cycle at a time; a current-thread runtime is all the loop needs
    let state = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(run(&collector, config.interval(), shutdown_signal()));

    info!(
        cycles = state.cycles,
        successes = state.successes,
        "Collector stopped"
    );

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut file_config = FileConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut file_config, cli);

    // Before validation so its warnings are visible
    init_tracing(&file_config.logging, cli.log_level.as_deref());

    let config = file_config.into_config()?;
    config.prepare_base_location()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(interval) = cli.interval {
        config.interval = Some(interval);
    }
    if let Some(base_location) = &cli.base_location {
        config.base_location = Some(base_location.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping collection...");
        },
        _ = terminate => {
            info!("Received SIGTERM, stopping collection...");
        },
    }
}
