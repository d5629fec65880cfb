//! The byte-level seam between the AT client and a serial device.
//!
//! Both the real `serialport` handle and the in-memory mock implement
//! [`SerialPortAdapter`], so the AT client never needs real hardware in tests.

use super::error::PortError;
use std::time::Duration;

/// Settings used to open the modem's serial device.
///
/// The modem always speaks 8N1 without flow control, so only the parts that
/// actually vary between boards are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,
    /// Per-read timeout handed to the driver.
    pub timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_secs(3),
        }
    }
}

/// Synchronous byte I/O on a serial device.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes, returning how many were accepted.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read whatever is available into `buffer`.
    ///
    /// Returning an error for which [`PortError::is_idle`] is true means no data
    /// arrived within the driver timeout.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Device path or mock identifier.
    fn name(&self) -> &str;

    /// Change the per-read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Discard pending input and output.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Write all of `data`, retrying short writes.
    fn write_all_bytes(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            let n = self.write_bytes(data)?;
            if n == 0 {
                return Err(PortError::Io(std::io::ErrorKind::WriteZero.into()));
            }
            data = &data[n..];
        }
        Ok(())
    }
}
