//! Error types and handling for the relay server.
//!
//! This module defines the error types that can occur during relay
//! operations, providing clear categorization of different failure modes.

use std::net::SocketAddr;

/// Enumeration of possible relay errors.
///
/// Bind failures prevent startup; transport and protocol errors are scoped
/// to the connection they occurred on.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The listening socket could not be bound (address or port in use)
    #[error("can't bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level I/O failure on a socket
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or oversized frame, or invalid packet JSON
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Write attempted on a connection that is already shut down
    #[error("connection {0} is closed")]
    Closed(String),
}

impl RelayError {
    /// True when the error is the clean end-of-stream a peer produces by
    /// closing its socket, as opposed to a failure worth warning about.
    pub fn is_clean_eof(&self) -> bool {
        matches!(self, RelayError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
