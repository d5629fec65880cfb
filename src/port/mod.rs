//! Serial port abstraction.
//!
//! The AT client talks to a [`SerialPortAdapter`], which is either a real
//! device ([`SyncSerialPort`]) or an in-memory [`MockSerialPort`].

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::{LinkSettings, SerialPortAdapter};
