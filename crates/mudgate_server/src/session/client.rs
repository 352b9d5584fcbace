//! Client session representation.
//!
//! A connection goes through two stages. Right after accept it is a
//! [`PendingSession`]: the acceptor owns it and the negotiator may talk over
//! its stream. Once the handshake finished it is frozen into a [`Session`]
//! whose capability fields can no longer change.

use super::SessionId;
use crate::config::NegotiationConfig;
use crate::negotiation::{NegotiationOutcome, WindowSize};
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};

/// A freshly accepted connection that has not finished negotiation.
#[derive(Debug)]
pub struct PendingSession<S = TcpStream> {
    id: SessionId,
    stream: S,
    remote_addr: SocketAddr,
    connected_at: SystemTime,
}

impl<S> PendingSession<S> {
    /// Creates a pending session and records the current time as its
    /// creation timestamp.
    pub fn new(id: SessionId, stream: S, remote_addr: SocketAddr) -> Self {
        Self {
            id,
            stream,
            remote_addr,
            connected_at: SystemTime::now(),
        }
    }

    /// The identifier this session will be registered under.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Mutable access to the raw stream for the handshake.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Freezes the negotiated capabilities into a [`Session`].
    ///
    /// Dimensions the client did not report are taken from `defaults`.
    pub fn into_session(self, outcome: &NegotiationOutcome, defaults: &NegotiationConfig) -> Session<S> {
        let window = outcome.window_size_or(WindowSize {
            width: defaults.default_width,
            height: defaults.default_height,
        });

        Session {
            id: self.id,
            remote_addr: self.remote_addr,
            connected_at: self.connected_at,
            window,
            linemode: outcome.linemode_enabled(),
            stream: Mutex::new(self.stream),
            display_name: RwLock::new(None),
        }
    }
}

/// Server-side record of one connected client.
///
/// The session owns the connection stream for its whole lifetime. The game
/// layer borrows it through [`Session::stream`].
#[derive(Debug)]
pub struct Session<S = TcpStream> {
    id: SessionId,
    remote_addr: SocketAddr,
    connected_at: SystemTime,
    window: WindowSize,
    linemode: bool,
    stream: Mutex<S>,
    /// Player name, set by the game layer once the player has logged in
    display_name: RwLock<Option<String>>,
}

impl<S> Session<S> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    /// Terminal dimensions, either reported by the client or the defaults.
    pub fn window_size(&self) -> WindowSize {
        self.window
    }

    pub fn width(&self) -> u16 {
        self.window.width
    }

    pub fn height(&self) -> u16 {
        self.window.height
    }

    /// Whether the client answered the linemode request without refusing it.
    pub fn linemode_enabled(&self) -> bool {
        self.linemode
    }

    /// The connection stream. Lock it to read from or write to the client.
    pub fn stream(&self) -> &Mutex<S> {
        &self.stream
    }

    pub async fn display_name(&self) -> Option<String> {
        self.display_name.read().await.clone()
    }

    pub async fn set_display_name(&self, name: impl Into<String>) {
        *self.display_name.write().await = Some(name.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    #[test]
    fn test_into_session_uses_negotiated_size() {
        let pending = PendingSession::new(SessionId(7), (), addr());
        let outcome = NegotiationOutcome::Success { width: 132, height: 50 };

        let session = pending.into_session(&outcome, &NegotiationConfig::default());

        assert_eq!(session.id(), SessionId(7));
        assert_eq!(session.width(), 132);
        assert_eq!(session.height(), 50);
        assert!(session.linemode_enabled());
        assert_eq!(session.remote_addr(), addr());
    }

    #[test]
    fn test_into_session_falls_back_to_defaults() {
        let pending = PendingSession::new(SessionId(1), (), addr());
        let defaults = NegotiationConfig {
            reply_timeout_ms: 1000,
            default_width: 100,
            default_height: 30,
        };

        let session = pending.into_session(&NegotiationOutcome::Fallback, &defaults);

        assert_eq!(session.window_size(), WindowSize { width: 100, height: 30 });
        assert!(!session.linemode_enabled());
    }

    #[tokio::test]
    async fn test_display_name_starts_unset() {
        let session = PendingSession::new(SessionId(1), (), addr())
            .into_session(&NegotiationOutcome::Fallback, &NegotiationConfig::default());
        assert_eq!(session.display_name().await, None);

        session.set_display_name("Ana").await;
        assert_eq!(session.display_name().await.as_deref(), Some("Ana"));
    }
}
