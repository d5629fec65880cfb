//! TOML configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `NRF_CREDSTORE_CONFIG` environment variable (explicit path)
//! 2. `./credstore.toml` (current directory)
//! 3. `$XDG_CONFIG_HOME/nrf-credstore/credstore.toml`, falling back to
//!    `~/.config/nrf-credstore/credstore.toml` (`%APPDATA%` on Windows)
//! 4. Built-in defaults
//!
//! # Environment Overrides
//!
//! - `NRF_CREDSTORE_SERIAL_DEFAULT_BAUD`
//! - `NRF_CREDSTORE_SERIAL_DEFAULT_TIMEOUT_MS`
//! - `NRF_CREDSTORE_SERIAL_WRITE_CHUNK_SIZE`
//! - `NRF_CREDSTORE_LOGGING_LEVEL`
//!
//! Command-line flags win over both.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
