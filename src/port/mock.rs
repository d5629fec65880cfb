//! In-memory serial port for tests.
//!
//! Bytes queued with [`MockSerialPort::enqueue_read`] are handed out by
//! `read_bytes`; everything written is logged. Clones share state, so a test
//! can keep one handle for inspection while the AT client owns another.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockPortState {
    read_queue: VecDeque<u8>,
    write_log: Vec<Vec<u8>>,
    should_timeout: bool,
    timeout: Duration,
    timeout_log: Vec<Duration>,
}

/// Mock serial port.
///
/// # Example
/// ```
/// use nrf_credstore::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"OK\r\n");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"OK\r\n");
///
/// port.write_bytes(b"AT\r\n").unwrap();
/// assert_eq!(port.written_text(), "AT\r\n");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_secs(1),
                ..Default::default()
            })),
        }
    }

    /// Queue bytes for subsequent reads.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Queue each line followed by `\r\n`.
    pub fn enqueue_lines(&mut self, lines: &[&str]) {
        let mut state = self.state.lock();
        for line in lines {
            state.read_queue.extend(line.as_bytes());
            state.read_queue.extend(b"\r\n");
        }
    }

    /// Every individual write call, in order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All written bytes concatenated and decoded lossily.
    pub fn written_text(&self) -> String {
        let state = self.state.lock();
        let bytes: Vec<u8> = state.write_log.iter().flatten().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear_write_log(&mut self) {
        self.state.lock().write_log.clear();
    }

    /// Make the next read fail with [`PortError::Timeout`], as a driver does
    /// when nothing arrives within its read timeout.
    pub fn set_should_timeout(&mut self, should_timeout: bool) {
        self.state.lock().should_timeout = should_timeout;
    }

    /// Every value passed to `set_timeout`, in order.
    pub fn timeout_log(&self) -> Vec<Duration> {
        self.state.lock().timeout_log.clone()
    }

    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.state.lock().write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::Timeout(state.timeout));
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }

        if n == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "no data available",
            )))
        } else {
            Ok(n)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.timeout = timeout;
        state.timeout_log.push(timeout);
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.state.lock().read_queue.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
