//! Server configuration types and defaults.
//!
//! This module contains the configuration structures used to initialize the
//! connection acceptor, the capability negotiator and the stats service.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the server front-end.
///
/// Contains the network settings for the game-protocol listener together
/// with the negotiation and stats service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address the game-protocol listener binds to
    pub bind_address: SocketAddr,

    /// Maximum number of registered sessions (0 for no limit)
    pub max_connections: usize,

    /// Listen backlog for both listeners
    pub backlog: u32,

    /// Interval between registry monitor sweeps in milliseconds (0 to disable)
    pub monitor_interval_ms: u64,

    /// Capability handshake settings
    pub negotiation: NegotiationConfig,

    /// Stats side-channel settings
    pub stats: StatsConfig,
}

/// Settings for the per-connection capability handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationConfig {
    /// Bound on each handshake receive, in milliseconds
    pub reply_timeout_ms: u64,

    /// Terminal width used when the client does not report one
    pub default_width: u16,

    /// Terminal height used when the client does not report one
    pub default_height: u16,
}

/// Settings for the read-only stats side-channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Whether the stats listener is bound at all
    pub enabled: bool,

    /// The socket address the stats listener binds to
    pub bind_address: SocketAddr,

    /// Which clock value is reported before the colon
    pub uptime_format: UptimeFormat,
}

/// The value reported in the uptime field of a stats line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UptimeFormat {
    /// Server start time in seconds since the Unix epoch
    #[default]
    StartedAt,
    /// Seconds elapsed since the server started
    Elapsed,
}

impl NegotiationConfig {
    /// Returns the per-receive bound as a [`Duration`].
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl ServerConfig {
    /// Returns the registry monitor interval, or `None` when disabled.
    pub fn monitor_interval(&self) -> Option<Duration> {
        (self.monitor_interval_ms > 0).then(|| Duration::from_millis(self.monitor_interval_ms))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 4111)),
            max_connections: 1000,
            backlog: 128,
            monitor_interval_ms: 1000,
            negotiation: NegotiationConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: 1000,
            default_width: 80,
            default_height: 24,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: SocketAddr::from(([0, 0, 0, 0], 4112)),
            uptime_format: UptimeFormat::StartedAt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_negotiation_timeout_is_one_second() {
        let config = NegotiationConfig::default();
        assert_eq!(config.reply_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_monitor_interval_zero_disables() {
        let mut config = ServerConfig::default();
        assert_eq!(config.monitor_interval(), Some(Duration::from_secs(1)));

        config.monitor_interval_ms = 0;
        assert_eq!(config.monitor_interval(), None);
    }
}
