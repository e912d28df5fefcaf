// ts-status-stats-config - Configuration for the status collector
//
// Supports configuration from multiple sources:
// 1. Command-line overrides applied by the binary (highest priority)
// 2. Environment variables (TS_STATUS_* prefix)
// 3. Config file: --config path, TS_STATUS_CONFIG, or ~/.config/ts-status.toml
// 4. Built-in defaults for optional fields (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, StdEnvSource, ENV_PREFIX};
pub use sources::{resolve_config_path, DEFAULT_CONFIG_FILE};

// Defaults shared with the flattener and the writer
pub use ts_status_stats_core::{DATE_PLACEHOLDER, DEFAULT_FILE_NAME_FORMAT, DEFAULT_SEPARATOR};

/// Validated collector configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub interval_secs: u64,
    pub base_location: PathBuf,
    pub file_name_format: String,
    pub separator: char,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Create the base location (and missing ancestors) if absent.
    pub fn prepare_base_location(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_location).with_context(|| {
            format!(
                "Failed to create base_location: {}",
                self.base_location.display()
            )
        })
    }
}

/// Configuration as read from TOML, before validation.
///
/// Required fields are optional here so that environment and command-line
/// overrides can supply them and missing fields can be reported together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_location: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<char>,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FileConfig {
    /// Read the config file and apply environment overrides from the process env.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        sources::load_file_config(explicit_path, &StdEnvSource)
    }

    /// Same as [`FileConfig::load`] with a caller-supplied environment.
    pub fn load_with_env<E: EnvSource>(explicit_path: Option<&Path>, env: &E) -> Result<Self> {
        sources::load_file_config(explicit_path, env)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            anyhow::bail!("Configuration file is empty");
        }
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Validate and fill defaults.
    pub fn into_config(self) -> Result<Config> {
        validation::validate_config(self)
    }
}

/// Status command configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_command")]
    pub command: Vec<String>,
}

fn default_command() -> Vec<String> {
    vec![
        "tailscale".to_string(),
        "status".to_string(),
        "--json".to_string(),
    ]
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}
