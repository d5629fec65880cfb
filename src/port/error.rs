//! Errors raised by the serial link itself.
//!
//! These describe the physical channel (missing device, I/O failure) and never
//! a modem reply; reply classification lives in [`crate::at`].

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the serial device.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device path does not exist.
    #[error("serial device not found: {0}")]
    NotFound(String),

    /// The device rejected the requested settings (e.g. an unsupported baud rate).
    #[error("invalid serial settings: {0}")]
    Config(String),

    /// A single read or write did not complete within the port timeout.
    #[error("serial operation timed out after {0:?}")]
    Timeout(Duration),

    /// Read/write failure on an open device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the `serialport` crate (permissions, busy device, ...).
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    pub fn not_found(device: impl Into<String>) -> Self {
        Self::NotFound(device.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the error only means "nothing arrived yet".
    ///
    /// The exchange loop keeps polling on these until its own deadline passes.
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}
