//! Listeners and long-lived workers.
//!
//! This module contains the game-protocol acceptor, the stats service, the
//! registry monitor and the `MudServer` that ties them together.

pub mod acceptor;
pub mod core;
pub mod listener;
pub mod monitor;
pub mod stats;

pub use acceptor::ConnectionAcceptor;
pub use self::core::{MudServer, ServerHandle};
pub use monitor::RegistryMonitor;
pub use stats::{format_stats_line, ServerClock, StatsService};
