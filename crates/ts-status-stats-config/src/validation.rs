// Configuration validation
//
// Checks required fields are present and values are sensible, then fills
// defaults for everything optional.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(raw: FileConfig) -> Result<Config> {
    let mut missing = Vec::new();
    if raw.interval.is_none() {
        missing.push("interval");
    }
    if raw.base_location.is_none() {
        missing.push("base_location");
    }
    if !missing.is_empty() {
        bail!(
            "Configuration is missing required fields: {}",
            missing.join(", ")
        );
    }

    let interval_secs = validate_interval(raw.interval.unwrap_or_default())?;

    let base_location = raw.base_location.unwrap_or_default();
    if base_location.as_os_str().is_empty() {
        bail!("base_location must not be empty");
    }

    let file_name_format = raw
        .file_name_format
        .unwrap_or_else(|| DEFAULT_FILE_NAME_FORMAT.to_string());
    validate_file_name_format(&file_name_format)?;

    let separator = raw.separator.unwrap_or(DEFAULT_SEPARATOR);
    if separator == '/' || separator == '\\' {
        bail!("separator must not be a path separator");
    }

    validate_source_config(&raw.source)?;

    Ok(Config {
        interval_secs,
        base_location,
        file_name_format,
        separator,
        source: raw.source,
        logging: raw.logging,
    })
}

fn validate_interval(interval: i64) -> Result<u64> {
    if interval <= 0 {
        bail!("interval must be greater than 0");
    }

    // Sub-minute polling rewrites the whole daily file every cycle
    if interval < 10 {
        warn!(
            interval,
            "interval is very short; each poll rewrites the day's Parquet file"
        );
    }

    Ok(interval as u64)
}

fn validate_file_name_format(format: &str) -> Result<()> {
    if format.trim().is_empty() {
        bail!("file_name_format must not be empty");
    }

    if format.contains('/') || format.contains('\\') {
        bail!("file_name_format must be a file name, not a path: {}", format);
    }

    if !format.contains(DATE_PLACEHOLDER) {
        warn!(
            file_name_format = format,
            "file_name_format has no {} placeholder; every day in a month shares one file",
            DATE_PLACEHOLDER
        );
    }

    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<()> {
    match config.command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => bail!("source.command must name a program to run"),
    }
}
