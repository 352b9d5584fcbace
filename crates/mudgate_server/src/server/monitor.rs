//! Background sweep removing sessions whose client went away.
//!
//! The game layer normally removes a session when it notices the
//! disconnect. The monitor covers sessions nobody is reading from. Removal
//! is idempotent, so it does not matter which side gets there first.

use crate::session::{Session, SessionId, SessionRegistry};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Periodically checks registered connections and removes closed ones.
pub struct RegistryMonitor {
    registry: Arc<SessionRegistry>,
    interval: Duration,
}

impl RegistryMonitor {
    pub fn new(registry: Arc<SessionRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Sweeps the registry every interval for the lifetime of the process.
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let removed = self.sweep().await;
            if removed > 0 {
                info!("🧹 Registry monitor removed {} closed session(s)", removed);
            }
        }
    }

    /// Runs one sweep and returns how many sessions were removed.
    ///
    /// Connections are checked on a snapshot, without holding the registry
    /// lock.
    pub async fn sweep(&self) -> usize {
        let closed: Vec<SessionId> = self
            .registry
            .snapshot()
            .await
            .iter()
            .filter(|session| is_closed(session))
            .map(|session| session.id())
            .collect();

        let mut removed = 0;
        for id in closed {
            if self.registry.remove(id).await.is_some() {
                removed += 1;
            }
        }
        removed
    }
}

/// Checks whether the peer closed the connection, without blocking.
///
/// A session whose stream is currently locked by the game layer is treated
/// as alive for this round.
fn is_closed(session: &Session) -> bool {
    let Ok(stream) = session.stream().try_lock() else {
        return false;
    };

    let mut peeked = [0u8; 1];
    match stream.peek(&mut peeked).now_or_never() {
        Some(Ok(0)) => true,
        Some(Err(e)) => {
            debug!("Session {} socket error: {}", session.id(), e);
            true
        }
        _ => false,
    }
}
