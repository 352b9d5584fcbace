//! Core server implementation.
//!
//! This module contains the `MudServer` struct, which binds the listeners,
//! owns the shared session registry and spawns the long-lived workers.

use super::{
    acceptor::ConnectionAcceptor,
    monitor::RegistryMonitor,
    stats::{ServerClock, StatsService},
};
use crate::{config::ServerConfig, error::ServerError, session::SessionRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The network front-end of the game server.
///
/// Construction binds every listener, so a port conflict fails startup
/// before anything runs. [`MudServer::start`] then spawns one task per
/// worker:
///
/// * **Game acceptor**: accepts, negotiates and registers clients
/// * **Stats service**: answers stats requests (if enabled)
/// * **Registry monitor**: removes sessions whose peer closed (if enabled)
///
/// The registry handle is shared with the game layer through
/// [`MudServer::registry`].
pub struct MudServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Shared table of live sessions
    registry: Arc<SessionRegistry>,

    /// When the server started, for the stats service
    clock: Arc<ServerClock>,

    acceptor: ConnectionAcceptor,

    /// `None` when the stats service is disabled
    stats: Option<StatsService>,
}

impl MudServer {
    /// Binds the listeners described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if either listener cannot be bound.
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let registry = Arc::new(SessionRegistry::new());
        let clock = Arc::new(ServerClock::start());

        let acceptor = ConnectionAcceptor::bind(&config, registry.clone())?;
        let stats = if config.stats.enabled {
            Some(StatsService::bind(&config.stats, config.backlog, registry.clone(), clock.clone())?)
        } else {
            info!("📭 Stats service disabled");
            None
        };

        Ok(Self {
            config,
            registry,
            clock,
            acceptor,
            stats,
        })
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn clock(&self) -> Arc<ServerClock> {
        self.clock.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the game listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }

    /// Address the stats listener is bound to, if it is enabled.
    pub fn stats_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.stats.as_ref().map(StatsService::local_addr)
    }

    /// Spawns the workers and returns a handle to them.
    pub fn start(self) -> ServerHandle {
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(self.acceptor.run()));

        if let Some(stats) = self.stats {
            tasks.push(tokio::spawn(stats.run()));
        }

        if let Some(every) = self.config.monitor_interval() {
            let monitor = RegistryMonitor::new(self.registry.clone(), every);
            tasks.push(tokio::spawn(monitor.run()));
            info!("🔍 Registry monitor sweeping every {:?}", every);
        }

        info!("🚀 Server started with {} worker(s)", tasks.len());
        ServerHandle {
            registry: self.registry,
            clock: self.clock,
            tasks,
        }
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    registry: Arc<SessionRegistry>,
    clock: Arc<ServerClock>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn clock(&self) -> Arc<ServerClock> {
        self.clock.clone()
    }

    /// Stops the workers and closes the registry.
    ///
    /// Handshakes still in progress are aborted along with the acceptor, and
    /// the closed registry rejects any that race past the abort.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down server...");
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Worker ended abnormally: {}", e);
                }
            }
        }

        let dropped = self.registry.close().await;
        info!("✅ Server stopped, {} session(s) dropped", dropped);
    }
}
