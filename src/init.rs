// Logging setup

use ts_status_stats_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Initialize tracing from the logging section of the configuration
///
/// Filter precedence: `cli_level` (the `--log-level` flag), then `RUST_LOG`,
/// then the configured level.
pub fn init_tracing(config: &LoggingConfig, cli_level: Option<&str>) {
    use tracing_subscriber::{fmt, prelude::*};

    let env_level = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(config, cli_level, env_level.as_deref());
    let env_filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}

fn filter_directive<'a>(
    config: &'a LoggingConfig,
    cli_level: Option<&'a str>,
    env_level: Option<&'a str>,
) -> &'a str {
    cli_level
        .or(env_level.filter(|level| !level.trim().is_empty()))
        .unwrap_or(config.level.as_str())
}
