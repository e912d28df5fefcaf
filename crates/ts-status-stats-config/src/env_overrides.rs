use super::FileConfig;
use anyhow::{anyhow, Result};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "TS_STATUS_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get a variable with the TS_STATUS_ prefix prepended to `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the TS_STATUS_ prefix (e.g. HOME).
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Apply environment-variable overrides on top of the file configuration.
pub fn apply_env_overrides<E: EnvSource>(config: &mut FileConfig, env: &E) -> Result<()> {
    if let Some(val) = get_env_i64(env, "INTERVAL")? {
        config.interval = Some(val);
    }
    if let Some(path) = get_env_string(env, "BASE_LOCATION") {
        config.base_location = Some(PathBuf::from(path));
    }
    if let Some(format) = get_env_string(env, "FILE_NAME_FORMAT") {
        config.file_name_format = Some(format);
    }
    if let Some(val) = get_env_char(env, "SEPARATOR")? {
        config.separator = Some(val);
    }

    // Status command, whitespace separated
    if let Some(command) = get_env_string(env, "STATUS_COMMAND") {
        config.source.command = command.split_whitespace().map(str::to_string).collect();
    }

    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.logging.format = format
            .parse()
            .map_err(|e| anyhow!("Invalid {}LOG_FORMAT value: {}", ENV_PREFIX, e))?;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_i64<E: EnvSource>(env: &E, key: &str) -> Result<Option<i64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<i64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_char<E: EnvSource>(env: &E, key: &str) -> Result<Option<char>> {
    match get_env_string(env, key) {
        Some(val) => {
            let mut chars = val.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Some(c)),
                _ => Err(anyhow!(
                    "Failed to parse {}{}: expected exactly one character, got {:?}",
                    ENV_PREFIX,
                    key,
                    val
                )),
            }
        }
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::LogFormat;
    use std::collections::HashMap;

    /// In-memory environment for tests.
    #[derive(Default)]
    pub(crate) struct MapEnv {
        vars: HashMap<String, String>,
    }

    impl MapEnv {
        pub(crate) fn with(mut self, key: &str, value: &str) -> Self {
            self.vars.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(&format!("{}{}", ENV_PREFIX, key)).cloned()
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_env_overrides_all_fields() {
        let env = MapEnv::default()
            .with("TS_STATUS_INTERVAL", "30")
            .with("TS_STATUS_BASE_LOCATION", "/srv/ts")
            .with("TS_STATUS_FILE_NAME_FORMAT", "ts-{date}.parquet")
            .with("TS_STATUS_SEPARATOR", ".")
            .with("TS_STATUS_STATUS_COMMAND", "cat status.json")
            .with("TS_STATUS_LOG_LEVEL", "debug")
            .with("TS_STATUS_LOG_FORMAT", "json");

        let mut config = FileConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.interval, Some(30));
        assert_eq!(config.base_location, Some(PathBuf::from("/srv/ts")));
        assert_eq!(config.file_name_format.as_deref(), Some("ts-{date}.parquet"));
        assert_eq!(config.separator, Some('.'));
        assert_eq!(config.source.command, vec!["cat", "status.json"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_overrides_leave_unset_fields() {
        let mut config = FileConfig {
            interval: Some(60),
            ..Default::default()
        };
        apply_env_overrides(&mut config, &MapEnv::default()).unwrap();

        assert_eq!(config.interval, Some(60));
        assert_eq!(config.base_location, None);
    }

    #[test]
    fn test_invalid_interval_env() {
        let env = MapEnv::default().with("TS_STATUS_INTERVAL", "soon");
        let err = apply_env_overrides(&mut FileConfig::default(), &env).unwrap_err();
        assert!(err.to_string().contains("TS_STATUS_INTERVAL"));
    }

    #[test]
    fn test_invalid_separator_env() {
        let env = MapEnv::default().with("TS_STATUS_SEPARATOR", "__");
        assert!(apply_env_overrides(&mut FileConfig::default(), &env).is_err());
    }
}
