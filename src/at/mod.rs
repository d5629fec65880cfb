//! AT command transport.
//!
//! [`AtClient`] owns the serial adapter and performs one command/response
//! exchange at a time: the command is written, then lines are read until a
//! terminal `OK`, `ERROR` or `+CME ERROR: <n>` arrives or the deadline passes.
//!
//! # Lifecycle
//!
//! ```text
//! Unopened --connect--> Connected --verify--> Verified --enable_error_codes--> ErrorCodesEnabled
//! ```
//!
//! Credential operations require `ErrorCodesEnabled`.

pub mod response;

use crate::error::{CredStoreError, Result};
use crate::port::{LinkSettings, SerialPortAdapter, SyncSerialPort};
use response::Terminal;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Appended to every command.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Default size of a single serial write.
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 256;

/// Upper bound for one blocking driver read, so the deadline is checked often.
const MAX_READ_SLICE: Duration = Duration::from_millis(100);

/// Pause after a non-blocking adapter reports no data.
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

const READ_BUFFER_SIZE: usize = 512;

/// Where the connection is in its setup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkState {
    Unopened,
    Connected,
    Verified,
    ErrorCodesEnabled,
}

/// Synchronous AT command client.
#[derive(Debug)]
pub struct AtClient {
    port: Option<Box<dyn SerialPortAdapter>>,
    state: LinkState,
    timeout: Duration,
    write_chunk_size: usize,
    /// Bytes received but not yet consumed as complete lines.
    pending: Vec<u8>,
}

impl Default for AtClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AtClient {
    /// A client with no open device.
    pub fn new() -> Self {
        Self {
            port: None,
            state: LinkState::Unopened,
            timeout: LinkSettings::default().timeout,
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
            pending: Vec::new(),
        }
    }

    /// Wrap an already open adapter. The client starts out `Connected`.
    pub fn from_port(port: Box<dyn SerialPortAdapter>, timeout: Duration) -> Self {
        Self {
            port: Some(port),
            state: LinkState::Connected,
            timeout,
            ..Self::new()
        }
    }

    pub fn with_write_chunk_size(mut self, size: usize) -> Self {
        self.write_chunk_size = size.max(1);
        self
    }

    /// Open `device` and use `timeout` as the deadline for every exchange.
    pub fn connect(&mut self, device: &str, baud_rate: u32, timeout: Duration) -> Result<()> {
        let settings = LinkSettings {
            baud_rate,
            timeout: timeout.min(MAX_READ_SLICE),
        };
        let mut port = SyncSerialPort::open(device, settings)?;
        port.clear_buffers()?;
        info!(device, baud_rate, ?timeout, "serial device opened");

        self.port = Some(Box::new(port));
        self.timeout = timeout;
        self.pending.clear();
        self.state = LinkState::Connected;
        Ok(())
    }

    /// Check that the device answers `AT` with `OK`.
    pub fn verify(&mut self) -> Result<()> {
        match self.send("AT") {
            Ok(_) => {
                self.state = self.state.max(LinkState::Verified);
                info!("AT client verified");
                Ok(())
            }
            Err(CredStoreError::AtCommand { response, .. }) => {
                warn!(%response, "device rejected the liveness check");
                Err(CredStoreError::NoAtClient)
            }
            Err(CredStoreError::Timeout { .. }) => {
                warn!("device did not answer the liveness check");
                Err(CredStoreError::NoAtClient)
            }
            Err(e) => Err(e),
        }
    }

    /// Switch the modem to numeric `+CME ERROR: <n>` replies.
    pub fn enable_error_codes(&mut self) -> Result<()> {
        self.send("AT+CMEE=1")?;
        self.state = LinkState::ErrorCodesEnabled;
        info!("numeric error codes enabled");
        Ok(())
    }

    /// Send one command and collect its payload lines.
    ///
    /// Returns the non-empty lines received before `OK`. A failure terminal
    /// becomes [`CredStoreError::AtCommand`]; no terminal before the deadline
    /// becomes [`CredStoreError::Timeout`] and the partial reply is dropped.
    pub fn send(&mut self, command: &str) -> Result<Vec<String>> {
        let Self {
            port,
            timeout,
            write_chunk_size,
            pending,
            ..
        } = self;
        let port = port
            .as_mut()
            .ok_or_else(|| CredStoreError::contract("the serial device is not connected"))?;

        debug!(command, "-> modem");
        let mut frame = Vec::with_capacity(command.len() + LINE_TERMINATOR.len());
        frame.extend_from_slice(command.as_bytes());
        frame.extend_from_slice(LINE_TERMINATOR);
        for chunk in frame.chunks(*write_chunk_size) {
            port.write_all_bytes(chunk)?;
        }

        let deadline = Instant::now() + *timeout;
        let mut lines = Vec::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            while let Some(line) = take_line(pending) {
                debug!(line = %line, "<- modem");
                match response::classify(&line) {
                    Some(Terminal::Ok) => return Ok(lines),
                    Some(Terminal::Error { code }) => {
                        return Err(CredStoreError::AtCommand {
                            command: command.to_string(),
                            response: line,
                            code,
                        })
                    }
                    None if line.is_empty() => {}
                    None => lines.push(line),
                }
            }

            if Instant::now() >= deadline {
                warn!(command, ?timeout, "no terminal response");
                pending.clear();
                return Err(CredStoreError::Timeout {
                    command: command.to_string(),
                    after: *timeout,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            port.set_timeout(remaining.min(MAX_READ_SLICE))?;
            match port.read_bytes(&mut buffer) {
                Ok(n) => pending.extend_from_slice(&buffer[..n]),
                Err(e) if e.is_idle() => std::thread::sleep(IDLE_BACKOFF),
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True once error codes are enabled.
    pub fn is_ready(&self) -> bool {
        self.state == LinkState::ErrorCodesEnabled
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port.as_deref().map(|p| p.name())
    }
}

/// Pop one `\n`-terminated line off the front of `pending`, without the
/// terminator and any trailing `\r`.
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let end = memchr::memchr(b'\n', pending)?;
    let raw: Vec<u8> = pending.drain(..=end).collect();
    let line = String::from_utf8_lossy(&raw);
    Some(line.trim_end_matches(['\r', '\n']).to_string())
}
