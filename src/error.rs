// ABOUTME: SMPP error types for the engine, the network driver and configuration
// ABOUTME: Provides structured error reporting with automatic conversion from I/O and codec errors

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::datatypes::CommandStatus;
use std::io;
use thiserror::Error;

/// Comprehensive error type for SMPP operations
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// Connection closed, by the peer or by a forced disconnect, while the
    /// operation was outstanding
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed length prefix or undecodable PDU bytes
    #[error("Framing error: {0}")]
    Framing(#[from] CodecError),

    /// The SMSC answered with a non-zero command_status
    #[error("Protocol error: {0:?}")]
    Protocol(CommandStatus),

    /// The bind handshake did not complete
    #[error("Bind failed: {0}")]
    Bind(#[from] BindError),

    /// No response arrived within the configured response timeout
    #[error("Operation timeout")]
    Timeout,

    /// Rejected configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Data validation error (invalid message length, malformed addresses, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Session not in the correct state for the operation
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// The sequence allocator could not issue a number
    #[error("Sequence allocation failed: {0}")]
    Sequence(String),
}

/// Why a bind did not reach a bound state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("SMSC rejected bind with {0:?}")]
    Rejected(CommandStatus),

    #[error("no bind response within the bind timeout")]
    Timeout,
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// The command_status carried by a rejected request, if that is what
    /// this error is
    pub fn command_status(&self) -> Option<CommandStatus> {
        match self {
            SmppError::Protocol(status) => Some(*status),
            SmppError::Bind(BindError::Rejected(status)) => Some(*status),
            _ => None,
        }
    }
}
