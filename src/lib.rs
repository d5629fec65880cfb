//! Manage X.509 certificates, private keys and pre-shared keys stored in a
//! cellular modem's secure credential storage.
//!
//! The modem is controlled with vendor AT commands over a serial link. This
//! library contains the protocol engine; the `nrfcredstore` binary is a thin
//! command-line front end.
//!
//! # Modules
//!
//! - `port`: serial device abstraction (real device and mock)
//! - `at`: AT command transport and reply classification
//! - `credstore`: credential operations and their command grammar
//! - `config`: TOML configuration with environment overrides
//! - `logging`: `tracing` subscriber setup
//! - `error`: unified error handling
//!
//! # Example
//!
//! ```no_run
//! use nrf_credstore::{AtClient, CredStore, FunctionalMode, TypeFilter};
//! use std::time::Duration;
//!
//! let mut client = AtClient::new();
//! client.connect("/dev/ttyACM0", 115200, Duration::from_secs(3))?;
//! client.verify()?;
//! client.enable_error_codes()?;
//!
//! let mut store = CredStore::new(&mut client);
//! store.set_functional_mode(FunctionalMode::Offline)?;
//! for cred in store.list(None, TypeFilter::Any)? {
//!     println!("{} {} {}", cred.tag, cred.cred_type, cred.sha);
//! }
//! # Ok::<(), nrf_credstore::CredStoreError>(())
//! ```

pub mod at;
pub mod config;
pub mod credstore;
pub mod error;
pub mod logging;
pub mod port;

pub use at::{AtClient, LinkState};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use credstore::{
    CredStore, CredType, Credential, FunctionalMode, TypeFilter, CME_NOT_FOUND, RESERVED_TAGS,
};
pub use error::{CredStoreError, Result};
pub use port::{LinkSettings, MockSerialPort, PortError, SerialPortAdapter, SyncSerialPort};
