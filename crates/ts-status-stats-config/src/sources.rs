// Configuration file discovery and loading.
//
// Priority order for the file location:
// 1. Explicit path (CLI --config)
// 2. TS_STATUS_CONFIG
// 3. $HOME/.config/ts-status.toml

use crate::env_overrides::{EnvSource, ENV_PREFIX};
use crate::FileConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Config file location relative to the user's home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".config/ts-status.toml";

/// Extension of config files from YAML-based releases, which are not read.
const LEGACY_EXTENSION: &str = "yml";

/// Work out which config file to read.
pub fn resolve_config_path<E: EnvSource>(explicit: Option<&Path>, env: &E) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env.get("CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let home = env.get_raw("HOME").with_context(|| {
        format!(
            "Cannot locate configuration: HOME is not set. Pass --config or set {}CONFIG",
            ENV_PREFIX
        )
    })?;
    Ok(Path::new(&home).join(DEFAULT_CONFIG_FILE))
}

/// Read the config file and layer environment overrides on top.
pub fn load_file_config<E: EnvSource>(explicit: Option<&Path>, env: &E) -> Result<FileConfig> {
    let path = resolve_config_path(explicit, env)?;

    if !path.exists() {
        let legacy = path.with_extension(LEGACY_EXTENSION);
        if legacy.exists() {
            anyhow::bail!(
                "Configuration file not found at {}. Found a YAML configuration at {}, \
                 which is no longer read; rewrite it as TOML at {}.",
                path.display(),
                legacy.display(),
                path.display()
            );
        }
        anyhow::bail!(
            "Configuration file not found at {}. Please create it with 'interval', \
             'base_location', and optionally 'file_name_format'.",
            path.display()
        );
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config = FileConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;

    config.apply_env_overrides_from(env)?;
    Ok(config)
}
