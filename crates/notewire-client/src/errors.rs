//! Client-side error types.

use notewire_core::errors::ProtocolError;
use thiserror::Error;

/// Failures surfaced by the connection manager.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be opened, or the handshake never completed.
    #[error("Failed to connect to server")]
    Connect,

    /// The server's first reply was not `status: connected`.
    #[error("server rejected handshake: {0}")]
    HandshakeRejected(String),

    /// The server's reply did not decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `start` was called twice.
    #[error("connection manager already started")]
    AlreadyStarted,

    /// `start` was called after `stop`.
    #[error("connection manager is stopped")]
    Stopped,
}
