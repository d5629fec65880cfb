//! Unified error type for the AT client and the credential store.

use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` for credential store operations.
pub type Result<T> = std::result::Result<T, CredStoreError>;

/// Everything that can go wrong between the caller and the modem.
///
/// Faults are propagated unchanged; the binary maps them to exit codes with
/// [`CredStoreError::exit_code`].
#[derive(Debug, Error)]
pub enum CredStoreError {
    /// The device answered `AT` with something other than `OK`, or not at all.
    #[error("the device does not implement the AT command interface")]
    NoAtClient,

    /// The modem rejected a well-formed command.
    #[error("AT command '{command}' failed: {response}")]
    AtCommand {
        command: String,
        response: String,
        /// Numeric code from `+CME ERROR: <n>`, when error codes are enabled.
        code: Option<u32>,
    },

    /// No terminal line arrived before the exchange deadline.
    #[error("no response to '{command}' within {after:?}")]
    Timeout { command: String, after: Duration },

    /// The serial link itself failed.
    #[error(transparent)]
    Transport(#[from] PortError),

    /// A precondition the caller is responsible for was violated.
    #[error("{0}")]
    CallerContract(String),

    /// A reply line did not match the command grammar.
    #[error("unexpected modem response '{line}': {reason}")]
    Parse { line: String, reason: String },

    /// Delete-all found nothing to delete.
    #[error("no credentials found on the device")]
    NoCredentials,

    /// Reading PEM input or writing DER output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CredStoreError {
    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::CallerContract(message.into())
    }

    pub(crate) fn parse(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// The `+CME ERROR` code carried by an [`CredStoreError::AtCommand`].
    pub fn cme_code(&self) -> Option<u32> {
        match self {
            Self::AtCommand { code, .. } => *code,
            _ => None,
        }
    }

    /// Process exit code used by the command-line tool.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoAtClient => 10,
            Self::AtCommand { .. } => 11,
            Self::Timeout { .. } => 12,
            Self::Transport(_) => 13,
            _ => 1,
        }
    }
}
