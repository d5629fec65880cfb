//! Credential management on top of the AT client.
//!
//! # Architecture
//!
//! ```text
//! CLI ──> CredStore ──> grammar (encode) ──> AtClient::send ──> grammar (decode)
//! ```
//!
//! Every operation is one command/response exchange, except
//! [`CredStore::delete_all`] which lists first and then deletes pair by pair.

pub mod grammar;
pub mod types;

pub use types::{is_reserved_tag, CredType, Credential, FunctionalMode, TypeFilter, RESERVED_TAGS};

use crate::at::AtClient;
use crate::error::{CredStoreError, Result};
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// `+CME ERROR` code the modem uses for "no such credential".
pub const CME_NOT_FOUND: u32 = 513;

/// Domain operations on the modem's credential storage.
///
/// Borrows the client for its lifetime; the client must have error codes
/// enabled before any operation runs.
pub struct CredStore<'a> {
    client: &'a mut AtClient,
}

impl<'a> CredStore<'a> {
    pub fn new(client: &'a mut AtClient) -> Self {
        Self { client }
    }

    fn exchange(&mut self, command: &str) -> Result<Vec<String>> {
        if !self.client.is_ready() {
            return Err(CredStoreError::contract(format!(
                "AT client is {:?}; verify it and enable error codes first",
                self.client.state()
            )));
        }
        self.client.send(command)
    }

    /// Set the radio functional mode. Storage operations need [`FunctionalMode::Offline`].
    pub fn set_functional_mode(&mut self, mode: FunctionalMode) -> Result<()> {
        self.exchange(&grammar::functional_mode(mode))?;
        info!(?mode, "functional mode set");
        Ok(())
    }

    /// List stored credentials, optionally restricted to one tag and type.
    ///
    /// A type restriction requires a tag. Records come back in modem order.
    pub fn list(&mut self, tag: Option<u32>, filter: TypeFilter) -> Result<Vec<Credential>> {
        let command = grammar::list(tag, filter)?;
        let lines = self.exchange(&command)?;
        let creds = lines
            .iter()
            .map(|line| grammar::parse_credential(line))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = creds.len(), "credentials listed");
        Ok(creds)
    }

    /// Store `content` at `(tag, cred_type)`, replacing any existing value.
    pub fn write(&mut self, tag: u32, cred_type: CredType, content: &str) -> Result<()> {
        if content.is_empty() {
            return Err(CredStoreError::contract("refusing to write empty content"));
        }
        self.exchange(&grammar::write(tag, cred_type, content))?;
        info!(tag, %cred_type, bytes = content.len(), "credential written");
        Ok(())
    }

    /// Read PEM/PSK text from `source` and store it.
    pub fn write_from(&mut self, tag: u32, cred_type: CredType, mut source: impl Read) -> Result<()> {
        let mut content = String::new();
        source.read_to_string(&mut content)?;
        self.write(tag, cred_type, &content)
    }

    /// Delete `(tag, cred_type)`. Returns `false` when nothing was stored there.
    pub fn delete(&mut self, tag: u32, cred_type: CredType) -> Result<bool> {
        match self.exchange(&grammar::delete(tag, cred_type)) {
            Ok(_) => {
                info!(tag, %cred_type, "credential deleted");
                Ok(true)
            }
            Err(CredStoreError::AtCommand {
                code: Some(CME_NOT_FOUND),
                ..
            }) => {
                debug!(tag, %cred_type, "nothing to delete");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete every credential outside the reserved tags.
    ///
    /// An empty store is reported as [`CredStoreError::NoCredentials`].
    /// Returns how many credentials were removed.
    pub fn delete_all(&mut self) -> Result<usize> {
        let creds = self.list(None, TypeFilter::Any)?;
        if creds.is_empty() {
            return Err(CredStoreError::NoCredentials);
        }

        let mut deleted = 0;
        for cred in creds {
            if is_reserved_tag(cred.tag) {
                warn!(tag = cred.tag, cred_type = %cred.cred_type, "skipping reserved tag");
                continue;
            }
            if self.delete(cred.tag, cred.cred_type)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Generate a private key at `tag` and write the resulting DER CSR to `sink`.
    ///
    /// `attributes` is an optional CSR subject string sent to the modem as is;
    /// the modem rejects strings it cannot encode. Returns the number of CSR
    /// bytes written.
    pub fn generate_key(&mut self, tag: u32, sink: &mut impl Write, attributes: &str) -> Result<usize> {
        let command = grammar::keygen(tag, attributes)?;
        let lines = self.exchange(&command)?;
        let der = grammar::parse_keygen(&lines)?;
        sink.write_all(&der)?;
        sink.flush()?;
        info!(tag, bytes = der.len(), "key generated");
        Ok(der.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;
    use std::time::Duration;

    fn ready_client(port: &MockSerialPort) -> AtClient {
        let mut feeder = port.clone();
        feeder.enqueue_lines(&["OK", "OK"]);
        let mut client = AtClient::from_port(Box::new(port.clone()), Duration::from_millis(50));
        client.verify().unwrap();
        client.enable_error_codes().unwrap();
        feeder.clear_write_log();
        client
    }

    #[test]
    fn test_operations_require_ready_client() {
        let port = MockSerialPort::new("MOCK0");
        let mut client = AtClient::from_port(Box::new(port.clone()), Duration::from_millis(50));
        let mut store = CredStore::new(&mut client);

        let err = store.list(None, TypeFilter::Any).unwrap_err();
        assert!(matches!(err, CredStoreError::CallerContract(_)));
        assert!(port.write_log().is_empty());
    }

    #[test]
    fn test_list_parses_records_in_order() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut client = ready_client(&port);
        port.enqueue_lines(&[
            "%CMNG: 12,1,\"BB\"",
            "%CMNG: 3,0,\"AA\"",
            "OK",
        ]);

        let creds = CredStore::new(&mut client).list(None, TypeFilter::Any).unwrap();
        let pairs: Vec<_> = creds.iter().map(|c| (c.tag, c.cred_type)).collect();
        assert_eq!(pairs, vec![(12, CredType::ClientCert), (3, CredType::RootCaCert)]);
        assert_eq!(port.written_text(), "AT%CMNG=1\r\n");
    }

    #[test]
    fn test_list_unknown_type_is_a_parse_error() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut client = ready_client(&port);
        port.enqueue_lines(&["%CMNG: 12,42,\"BB\"", "OK"]);

        let err = CredStore::new(&mut client).list(Some(12), TypeFilter::Any).unwrap_err();
        assert!(matches!(err, CredStoreError::Parse { .. }));
    }

    #[test]
    fn test_delete_maps_not_found_to_false() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut client = ready_client(&port);
        port.enqueue_lines(&["OK", "+CME ERROR: 513", "+CME ERROR: 514"]);
        let mut store = CredStore::new(&mut client);

        assert!(store.delete(1, CredType::Psk).unwrap());
        assert!(!store.delete(1, CredType::Psk).unwrap());
        let err = store.delete(1, CredType::Psk).unwrap_err();
        assert_eq!(err.cme_code(), Some(514));
    }

    #[test]
    fn test_write_rejects_empty_content() {
        let port = MockSerialPort::new("MOCK0");
        let mut client = ready_client(&port);
        let err = CredStore::new(&mut client)
            .write(1, CredType::RootCaCert, "")
            .unwrap_err();
        assert!(matches!(err, CredStoreError::CallerContract(_)));
        assert!(port.write_log().is_empty());
    }

    #[test]
    fn test_set_functional_mode() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut client = ready_client(&port);
        port.enqueue_lines(&["OK"]);

        CredStore::new(&mut client)
            .set_functional_mode(FunctionalMode::Offline)
            .unwrap();
        assert_eq!(port.written_text(), "AT+CFUN=4\r\n");
    }
}
