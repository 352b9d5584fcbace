//! Read-only stats side-channel.
//!
//! Any client connecting to the stats port immediately receives one line
//! describing the server, and the connection is closed. The line has the
//! form `<uptime>:<name1,name2,...>` where the names are the players
//! currently logged in and the uptime is a float in seconds. No request is
//! read and no negotiation takes place.

use super::listener::{back_off_after_accept_error, bind_listener};
use crate::{
    config::{StatsConfig, UptimeFormat},
    error::ServerError,
    session::SessionRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Records when the server started.
#[derive(Debug, Clone)]
pub struct ServerClock {
    started_at: SystemTime,
    started: Instant,
}

impl ServerClock {
    /// Starts the clock now.
    pub fn start() -> Self {
        Self {
            started_at: SystemTime::now(),
            started: Instant::now(),
        }
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// The value reported in the uptime field of a stats line.
    pub fn report(&self, format: UptimeFormat) -> f64 {
        match format {
            UptimeFormat::StartedAt => self
                .started_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
            UptimeFormat::Elapsed => self.uptime().as_secs_f64(),
        }
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Formats one stats line.
///
/// Whole numbers keep a trailing `.0` so the field always parses as a float.
pub fn format_stats_line(uptime: f64, names: &[String]) -> String {
    let mut field = uptime.to_string();
    if uptime.is_finite() && !field.contains('.') {
        field.push_str(".0");
    }
    format!("{}:{}", field, names.join(","))
}

/// Independent accept loop answering stats requests.
pub struct StatsService {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    clock: Arc<ServerClock>,
    uptime_format: UptimeFormat,
}

impl StatsService {
    /// Binds the stats listener.
    ///
    /// Callers skip this entirely when the service is disabled, so a disabled
    /// service never holds a port.
    pub fn bind(
        config: &StatsConfig,
        backlog: u32,
        registry: Arc<SessionRegistry>,
        clock: Arc<ServerClock>,
    ) -> Result<Self, ServerError> {
        let listener = bind_listener(config.bind_address, backlog)?;
        info!("📊 Stats listener bound on {}", config.bind_address);

        Ok(Self {
            listener,
            registry,
            clock,
            uptime_format: config.uptime_format,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop for the lifetime of the process.
    ///
    /// Requests are answered inline: each one is a single short write.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = self.serve(stream, addr).await {
                        error!("Stats request from {} failed: {}", addr, e);
                    }
                }
                Err(e) => back_off_after_accept_error("Stats", e).await,
            }
        }
    }

    /// Builds the current stats line from a registry snapshot.
    pub async fn current_line(&self) -> String {
        let names = self.registry.player_names().await;
        format_stats_line(self.clock.report(self.uptime_format), &names)
    }

    async fn serve(&self, mut stream: TcpStream, addr: SocketAddr) -> Result<(), ServerError> {
        let line = self.current_line().await;
        debug!("Sending stats to {}: {}", addr, line);

        stream.write_all(line.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }
}
