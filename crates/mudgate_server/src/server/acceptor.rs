//! Game-protocol acceptor.
//!
//! Accepts raw telnet connections, runs the capability handshake on each of
//! them and publishes the resulting session into the registry.

use super::listener::{back_off_after_accept_error, bind_listener};
use crate::{
    config::ServerConfig,
    error::ServerError,
    negotiation::Negotiator,
    session::{PendingSession, Session, SessionRegistry},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Sent to clients turned away because the registry is at capacity.
const SERVER_FULL_NOTICE: &[u8] = b"The server is full right now, please try again later.\r\n";

/// Long-lived accept loop for the game-protocol port.
///
/// The listener is bound when the acceptor is constructed, so a port
/// conflict surfaces at startup. Once running, no single client can stop
/// the loop: every per-connection failure is logged and dropped.
pub struct ConnectionAcceptor {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    negotiator: Arc<Negotiator>,
    max_connections: usize,
}

impl ConnectionAcceptor {
    /// Binds the game-protocol listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the configured address cannot be
    /// bound. This is the only fatal error of the acceptor.
    pub fn bind(config: &ServerConfig, registry: Arc<SessionRegistry>) -> Result<Self, ServerError> {
        let listener = bind_listener(config.bind_address, config.backlog)?;
        info!("🎮 Game listener bound on {}", config.bind_address);

        Ok(Self {
            listener,
            registry,
            negotiator: Arc::new(Negotiator::new(config.negotiation)),
            max_connections: config.max_connections,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop for the lifetime of the process.
    ///
    /// Each accepted connection gets its own task, so a client that stalls
    /// the handshake only delays itself. The tasks belong to the loop:
    /// aborting the loop aborts every handshake still in progress.
    pub async fn run(self) {
        debug!("Listener started");
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let registry = self.registry.clone();
                        let negotiator = self.negotiator.clone();
                        let max_connections = self.max_connections;

                        connections.spawn(async move {
                            match handle_connection(stream, addr, registry, negotiator, max_connections).await {
                                Ok(_) => {}
                                Err(ServerError::RegistryClosed(id)) => {
                                    debug!("Dropped session {} from {} during shutdown", id, addr);
                                }
                                Err(e) => error!("Connection error from {}: {}", addr, e),
                            }
                        });
                    }
                    Err(e) => back_off_after_accept_error("Game", e).await,
                },
                // Reap finished handshakes so the set only holds live ones.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }
}

/// Handles one accepted connection up to its registration.
///
/// Returns `Ok(None)` when the client was turned away because the server is
/// full. On success the registered session now owns the stream.
pub async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    negotiator: Arc<Negotiator>,
    max_connections: usize,
) -> Result<Option<Arc<Session>>, ServerError> {
    // Soft limit: connections still negotiating are not counted.
    if max_connections > 0 && registry.len().await >= max_connections {
        warn!("🚫 Turning away {}: {} sessions registered", addr, max_connections);
        stream.write_all(SERVER_FULL_NOTICE).await?;
        stream.shutdown().await?;
        return Ok(None);
    }

    let mut pending = PendingSession::new(registry.next_id(), stream, addr);
    let outcome = negotiator.negotiate(pending.stream_mut()).await;
    info!("🤝 Negotiated with {}: {:?}", addr, outcome);

    let session = pending.into_session(&outcome, negotiator.config());
    registry.add(session).await.map(Some)
}
