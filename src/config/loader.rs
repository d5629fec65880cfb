//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "NRF_CREDSTORE";

const CONFIG_FILE_NAME: &str = "credstore.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "NRF_CREDSTORE_CONFIG";

const APP_DIR: &str = "nrf-credstore";

/// Loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using the standard resolution order, then apply
    /// environment overrides and validate.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    debug!(path = %path.display(), "loading configuration");
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(key: &str) -> (String, Option<String>) {
    let name = format!("{ENV_PREFIX}_{key}");
    let value = std::env::var(&name).ok();
    (name, value)
}

fn parse_env<T: std::str::FromStr>(name: String, value: &str, what: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse(name, format!("Invalid {what}")))
}

/// Apply `NRF_CREDSTORE_<SECTION>_<KEY>` overrides.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let (name, Some(val)) = env_var("SERIAL_DEFAULT_BAUD") {
        config.serial.default_baud = parse_env(name, &val, "baud rate")?;
    }
    if let (name, Some(val)) = env_var("SERIAL_DEFAULT_TIMEOUT_MS") {
        config.serial.default_timeout_ms = parse_env(name, &val, "timeout")?;
    }
    if let (name, Some(val)) = env_var("SERIAL_WRITE_CHUNK_SIZE") {
        config.serial.write_chunk_size = parse_env(name, &val, "chunk size")?;
    }
    if let (_, Some(val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    Ok(())
}

fn validate(config: &Config) -> ConfigResult<()> {
    if config.serial.default_baud == 0 {
        return Err(ConfigError::validation("serial.default_baud", "must be positive"));
    }
    if config.serial.default_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "serial.default_timeout_ms",
            "must be positive",
        ));
    }
    if config.serial.write_chunk_size == 0 {
        return Err(ConfigError::validation(
            "serial.write_chunk_size",
            "must be positive",
        ));
    }
    Ok(())
}
