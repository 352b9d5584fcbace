//! Error types and handling for the server front-end.
//!
//! This module defines the error types that can occur while binding,
//! accepting and registering client connections. Handshake failures have
//! their own type in [`crate::negotiation`] because they never leave the
//! negotiator.

use crate::session::SessionId;
use std::net::SocketAddr;

/// Enumeration of possible server errors.
///
/// Only [`ServerError::Bind`] is allowed to abort startup. Every other
/// variant is produced per connection and is logged by the loop that
/// produced it.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A listening socket could not be bound at startup
    #[error("Failed to bind listener on {address}: {source}")]
    Bind {
        /// The address that was requested
        address: SocketAddr,
        /// The underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Accepting a single raw connection failed
    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// The registry already holds a session with this identifier
    #[error("Session {0} is already registered")]
    DuplicateSession(SessionId),

    /// The registry was closed at shutdown before this session could be added
    #[error("Session {0} arrived after the registry was closed")]
    RegistryClosed(SessionId),

    /// I/O failure while talking to an already accepted connection
    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}
