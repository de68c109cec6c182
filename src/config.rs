use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_SHARES, DEFAULT_THRESHOLD, SCAN_DEBOUNCE_MS,
};
use crate::pipeline::validate_parameters;

const CONFIG_FILE: &str = "conf.toml";
const ENV_PREFIX: &str = "LASTRESORT";

/// Settings for splitting and scanning, read from `<dir>/conf.toml` and overridden by
/// `LASTRESORT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResortConfig {
    /// Characters of share text per QR code.
    pub chunk_size: usize,
    /// Window for ignoring repeated identical scans.
    pub debounce_ms: u64,
    /// Default number of shares to create.
    pub shares: usize,
    /// Default number of shares needed to recover.
    pub threshold: usize,
}

impl Default for ResortConfig {
    fn default() -> Self {
        ResortConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            debounce_ms: SCAN_DEBOUNCE_MS,
            shares: DEFAULT_SHARES,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ResortConfig {
    /// Loads the configuration in directory `path`, creating the directory and a default
    /// `conf.toml` first if they do not exist.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config_path = PathBuf::from(path);

        if !config_path.exists() {
            fs::create_dir_all(&config_path).map_err(|err| ConfigError::Foreign(Box::new(err)))?;
        }

        let conf_file = config_path.join(CONFIG_FILE);
        if !conf_file.exists() {
            let toml = toml::to_string_pretty(&ResortConfig::default())
                .map_err(|err| ConfigError::Foreign(Box::new(err)))?;
            fs::write(&conf_file, toml).map_err(|err| ConfigError::Foreign(Box::new(err)))?;
        }

        debug!("📝 Loaded config at path: {:#?}", config_path);
        Self::load(&conf_file)
    }

    /// Loads `conf_file` layered under the environment, without creating anything.
    pub fn load(conf_file: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::from(conf_file).required(false))
            // Eg.. `LASTRESORT_CHUNK_SIZE=500 lastresort split ...`
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        ResortConfig::try_from(settings)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl TryFrom<Config> for ResortConfig {
    type Error = ConfigError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        let defaults = ResortConfig::default();
        let get_or = |key: &str, default: u64| -> Result<u64, ConfigError> {
            match config.get::<u64>(key) {
                Ok(value) => Ok(value),
                Err(ConfigError::NotFound(_)) => Ok(default),
                Err(err) => Err(err),
            }
        };

        let resort_config = ResortConfig {
            chunk_size: get_or("chunk_size", defaults.chunk_size as u64)? as usize,
            debounce_ms: get_or("debounce_ms", defaults.debounce_ms)?,
            shares: get_or("shares", defaults.shares as u64)? as usize,
            threshold: get_or("threshold", defaults.threshold as u64)? as usize,
        };

        if resort_config.chunk_size == 0 {
            return Err(ConfigError::Message(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        validate_parameters(resort_config.shares, resort_config.threshold)
            .map_err(|err| ConfigError::Message(err.to_string()))?;

        Ok(resort_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested");

        let config = ResortConfig::new(path.to_str().unwrap()).unwrap();
        assert_eq!(config, ResortConfig::default());
        assert!(path.join(CONFIG_FILE).exists());
        assert_eq!(config.debounce(), Duration::from_millis(1000));
    }

    #[test]
    fn test_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "chunk_size = 250\nshares = 7\nthreshold = 4\n",
        )
        .unwrap();

        let config = ResortConfig::new(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.shares, 7);
        assert_eq!(config.threshold, 4);
        assert_eq!(config.debounce_ms, SCAN_DEBOUNCE_MS);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for contents in [
            "chunk_size = 0\n",
            "shares = 11\nthreshold = 3\n",
            "shares = 3\nthreshold = 4\n",
            "threshold = 1\n",
        ] {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join(CONFIG_FILE), contents).unwrap();
            assert!(
                ResortConfig::new(dir.path().to_str().unwrap()).is_err(),
                "{contents:?} should be rejected"
            );
        }
    }
}
