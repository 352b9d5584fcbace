//! Shared registry of live sessions.
//!
//! The registry is the single point of truth for "who is connected". The
//! network layer adds a session once its handshake finished, and whichever
//! side first notices a closed connection removes it again.

use super::{client::Session, SessionId};
use crate::error::ServerError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

/// Notification published after a registry mutation has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A session became visible to the game layer
    Added(SessionId),
    /// A session was removed
    Removed(SessionId),
}

/// Central table of all currently connected sessions.
///
/// All reads and writes go through one exclusive lock, which is held only
/// for the map operation itself. Sessions are stored behind `Arc`, so a
/// snapshot hands out fully built records and never a partially inserted
/// one.
///
/// The registry is shared by wrapping it in an `Arc` and handing a clone to
/// every worker that needs it.
#[derive(Debug)]
pub struct SessionRegistry<S = TcpStream> {
    /// Map of session ID to the live session
    sessions: Mutex<HashMap<SessionId, Arc<Session<S>>>>,

    /// Atomic counter for generating unique session IDs
    next_id: AtomicU64,

    /// Set by [`SessionRegistry::close`]; only read or written under the map lock
    closed: AtomicBool,

    /// Broadcast sender for add/remove notifications
    events: broadcast::Sender<RegistryEvent>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SessionRegistry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            events,
        }
    }

    /// Allocates a fresh session identifier.
    pub fn next_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Publishes a negotiated session.
    ///
    /// Fails with [`ServerError::DuplicateSession`] when the identifier is
    /// already present. That only happens when ids are handed out wrongly
    /// upstream, so it is logged as an error and the new session is dropped
    /// rather than merged.
    ///
    /// Fails with [`ServerError::RegistryClosed`] once the registry has been
    /// closed; the session, and with it the connection, is dropped.
    pub async fn add(&self, session: Session<S>) -> Result<Arc<Session<S>>, ServerError> {
        let id = session.id();
        let session = Arc::new(session);

        {
            let mut sessions = self.sessions.lock().await;
            if self.closed.load(Ordering::Acquire) {
                drop(sessions);
                debug!("Session {} arrived after shutdown, dropping it", id);
                return Err(ServerError::RegistryClosed(id));
            }
            if sessions.contains_key(&id) {
                drop(sessions);
                error!("🚨 Refusing to register session {}: identifier already in use", id);
                return Err(ServerError::DuplicateSession(id));
            }
            sessions.insert(id, session.clone());
        }

        info!("🔗 Session {} from {} registered", id, session.remote_addr());
        let _ = self.events.send(RegistryEvent::Added(id));
        Ok(session)
    }

    /// Removes a session if it is still registered.
    ///
    /// Removing an absent identifier is a no-op, so the game layer and the
    /// registry monitor may both call this for the same connection. Returns
    /// the removed session, if any.
    pub async fn remove(&self, id: SessionId) -> Option<Arc<Session<S>>> {
        let removed = self.sessions.lock().await.remove(&id);

        match &removed {
            Some(session) => {
                info!("❌ Session {} from {} removed", id, session.remote_addr());
                let _ = self.events.send(RegistryEvent::Removed(id));
            }
            None => debug!("Session {} already removed", id),
        }

        removed
    }

    /// Looks up a single session.
    pub async fn get(&self, id: SessionId) -> Option<Arc<Session<S>>> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Copies out the current sessions, ordered by identifier.
    ///
    /// The lock is released before this returns, so callers can iterate the
    /// result and do I/O freely.
    pub async fn snapshot(&self) -> Vec<Arc<Session<S>>> {
        let mut sessions: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        sessions.sort_by_key(|session| session.id());
        sessions
    }

    /// Display names of all logged-in players, in session order.
    ///
    /// Sessions that have not been given a name yet are skipped.
    pub async fn player_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for session in self.snapshot().await {
            if let Some(name) = session.display_name().await {
                names.push(name);
            }
        }
        names
    }

    /// Sets the display name of a registered session.
    ///
    /// Returns `false` if the session is not registered.
    pub async fn set_display_name(&self, id: SessionId, name: impl Into<String>) -> bool {
        match self.get(id).await {
            Some(session) => {
                session.set_display_name(name).await;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Drops every session. Only used at shutdown.
    pub async fn clear(&self) -> usize {
        let drained: Vec<_> = self.sessions.lock().await.drain().collect();
        for (id, _) in &drained {
            let _ = self.events.send(RegistryEvent::Removed(*id));
        }
        drained.len()
    }

    /// Clears the registry and rejects every later [`SessionRegistry::add`].
    ///
    /// Used at shutdown, so that a handshake finishing late cannot publish a
    /// session nobody will serve.
    pub async fn close(&self) -> usize {
        let drained: Vec<_> = {
            let mut sessions = self.sessions.lock().await;
            self.closed.store(true, Ordering::Release);
            sessions.drain().collect()
        };
        for (id, _) in &drained {
            let _ = self.events.send(RegistryEvent::Removed(*id));
        }
        drained.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Creates a receiver for add/remove notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}
