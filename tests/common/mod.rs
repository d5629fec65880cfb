//! Shared test utilities.
//!
//! `SimulatedModem` speaks enough of the credential AT dialect to run whole
//! store workflows without hardware: it parses the commands written to it,
//! keeps credentials in memory and queues the replies a real modem would send.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nrf_credstore::credstore::grammar::unescape_content;
use nrf_credstore::{AtClient, PortError, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Exchange deadline used by tests that expect a reply.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(200);

/// DER bytes returned for every generated CSR.
pub const FAKE_CSR_DER: &[u8] = &[0x30, 0x82, 0x01, 0x0a, 0x02, 0x01, 0x00];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub tag: u32,
    pub type_code: u8,
    pub content: String,
}

#[derive(Debug, Default)]
struct ModemState {
    inbound: Vec<u8>,
    outbound: VecDeque<u8>,
    commands: Vec<String>,
    write_calls: usize,
    store: Vec<StoredCredential>,
    error_codes: bool,
    offline: bool,
    silent: bool,
}

/// In-memory modem implementing [`SerialPortAdapter`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedModem {
    state: Arc<Mutex<ModemState>>,
}

impl SimulatedModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a credential in storage without going through the AT interface.
    pub fn preload(&self, tag: u32, type_code: u8, content: &str) {
        self.state.lock().store.push(StoredCredential {
            tag,
            type_code,
            content: content.to_string(),
        });
    }

    pub fn stored(&self) -> Vec<StoredCredential> {
        self.state.lock().store.clone()
    }

    pub fn content_of(&self, tag: u32, type_code: u8) -> Option<String> {
        self.state
            .lock()
            .store
            .iter()
            .find(|c| c.tag == tag && c.type_code == type_code)
            .map(|c| c.content.clone())
    }

    /// Complete commands received so far, without terminators.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// Number of `write_bytes` calls made by the client.
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    /// Stop answering commands (they are still recorded).
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    pub fn is_offline(&self) -> bool {
        self.state.lock().offline
    }

    /// Mark the radio offline without a `+CFUN` command.
    pub fn force_offline(&self) {
        self.state.lock().offline = true;
    }
}

/// Digest the modem would report; only has to be stable per content.
pub fn fake_sha(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:064X}", hasher.finish())
}

/// True once `buf` holds a full command: `\r\n` outside a quoted argument.
fn command_complete(buf: &[u8]) -> bool {
    if !buf.ends_with(b"\r\n") {
        return false;
    }
    let mut in_quotes = false;
    let mut escaped = false;
    for &b in buf {
        match b {
            _ if escaped => escaped = false,
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            _ => {}
        }
    }
    !in_quotes
}

impl ModemState {
    fn error(&self, code: u32) -> Vec<String> {
        if self.error_codes {
            vec![format!("+CME ERROR: {code}")]
        } else {
            vec!["ERROR".to_string()]
        }
    }

    fn handle(&mut self, command: &str) -> Vec<String> {
        let ok = || vec!["OK".to_string()];
        match command {
            "AT" => return ok(),
            "AT+CMEE=1" => {
                self.error_codes = true;
                return ok();
            }
            _ => {}
        }

        if let Some(mode) = command.strip_prefix("AT+CFUN=") {
            return match mode {
                "4" | "0" => {
                    self.offline = true;
                    ok()
                }
                "1" => {
                    self.offline = false;
                    ok()
                }
                _ => self.error(50),
            };
        }
        if let Some(args) = command.strip_prefix("AT%CMNG=") {
            return self.cmng(args);
        }
        if let Some(args) = command.strip_prefix("AT%KEYGEN=") {
            return self.keygen(args);
        }
        vec!["ERROR".to_string()]
    }

    fn cmng(&mut self, args: &str) -> Vec<String> {
        let mut parts = args.splitn(4, ',');
        let op = parts.next().unwrap_or_default();
        let tag = parts.next().map(|t| t.parse::<u32>());
        let type_code = parts.next().map(|t| t.parse::<u8>());
        let content = parts.next();

        match op {
            "1" => {
                let tag = match tag {
                    Some(Ok(t)) => Some(t),
                    Some(Err(_)) => return self.error(50),
                    None => None,
                };
                let type_code = match type_code {
                    Some(Ok(c)) => Some(c),
                    Some(Err(_)) => return self.error(50),
                    None => None,
                };
                let mut lines: Vec<String> = self
                    .store
                    .iter()
                    .filter(|c| tag.map_or(true, |t| t == c.tag))
                    .filter(|c| type_code.map_or(true, |t| t == c.type_code))
                    .map(|c| format!("%CMNG: {},{},\"{}\"", c.tag, c.type_code, fake_sha(&c.content)))
                    .collect();
                lines.push("OK".to_string());
                lines
            }
            "0" => {
                if !self.offline {
                    return self.error(518);
                }
                let (Some(Ok(tag)), Some(Ok(type_code)), Some(raw)) = (tag, type_code, content) else {
                    return self.error(50);
                };
                let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
                    return self.error(50);
                };
                let Ok(content) = unescape_content(inner) else {
                    return self.error(50);
                };
                self.store.retain(|c| !(c.tag == tag && c.type_code == type_code));
                self.store.push(StoredCredential {
                    tag,
                    type_code,
                    content,
                });
                vec!["OK".to_string()]
            }
            "3" => {
                if !self.offline {
                    return self.error(518);
                }
                let (Some(Ok(tag)), Some(Ok(type_code))) = (tag, type_code) else {
                    return self.error(50);
                };
                let before = self.store.len();
                self.store.retain(|c| !(c.tag == tag && c.type_code == type_code));
                if self.store.len() == before {
                    self.error(513)
                } else {
                    vec!["OK".to_string()]
                }
            }
            _ => self.error(50),
        }
    }

    fn keygen(&mut self, args: &str) -> Vec<String> {
        let mut parts = args.splitn(4, ',');
        let Some(Ok(tag)) = parts.next().map(|t| t.parse::<u32>()) else {
            return self.error(50);
        };
        if parts.next() != Some("2") || parts.next() != Some("0") {
            return self.error(50);
        }
        if let Some(raw) = parts.next() {
            let Some(subject) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
                return self.error(50);
            };
            if !subject.split(',').all(|rdn| rdn.split_once('=').is_some_and(|(k, _)| !k.is_empty())) {
                return self.error(50);
            }
        }
        if !self.offline {
            return self.error(518);
        }
        self.store.retain(|c| !(c.tag == tag && c.type_code == 2));
        self.store.push(StoredCredential {
            tag,
            type_code: 2,
            content: "generated".to_string(),
        });
        vec![
            format!(
                "%KEYGEN: \"{}.{}\"",
                URL_SAFE_NO_PAD.encode(FAKE_CSR_DER),
                URL_SAFE_NO_PAD.encode(b"cose")
            ),
            "OK".to_string(),
        ]
    }
}

impl SerialPortAdapter for SimulatedModem {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.write_calls += 1;
        state.inbound.extend_from_slice(data);

        if command_complete(&state.inbound) {
            let raw = std::mem::take(&mut state.inbound);
            let command = String::from_utf8_lossy(&raw[..raw.len() - 2]).into_owned();
            state.commands.push(command.clone());
            if !state.silent {
                for line in state.handle(&command) {
                    state.outbound.extend(line.as_bytes());
                    state.outbound.extend(b"\r\n");
                }
            }
        }
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        let n = buffer.len().min(state.outbound.len());
        if n == 0 {
            return Err(PortError::Io(std::io::ErrorKind::WouldBlock.into()));
        }
        for (slot, byte) in buffer.iter_mut().zip(state.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn name(&self) -> &str {
        "SIM0"
    }

    fn set_timeout(&mut self, _timeout: Duration) -> Result<(), PortError> {
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.inbound.clear();
        state.outbound.clear();
        Ok(())
    }
}

/// A client over `modem` that has been verified and has error codes enabled.
pub fn ready_client(modem: &SimulatedModem) -> AtClient {
    let mut client = AtClient::from_port(Box::new(modem.clone()), TEST_TIMEOUT);
    client.verify().expect("simulated modem answers AT");
    client
        .enable_error_codes()
        .expect("simulated modem accepts AT+CMEE=1");
    modem.clear_commands();
    client
}

/// A certificate-sized PEM body of roughly `len` bytes.
pub fn pem_of_len(label: &str, len: usize) -> String {
    let mut body = String::new();
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut i = 0usize;
    while body.len() < len {
        body.push(alphabet[i % alphabet.len()] as char);
        i += 1;
        if i % 64 == 0 {
            body.push('\n');
        }
    }
    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}
