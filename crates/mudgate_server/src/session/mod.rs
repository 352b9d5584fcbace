//! Session tracking for accepted client connections.
//!
//! This module holds the per-client session record and the shared registry
//! that publishes live sessions to the rest of the game.

pub mod registry;
pub mod client;

pub use registry::{RegistryEvent, SessionRegistry};
pub use client::{PendingSession, Session};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a session.
///
/// Identifiers are allocated by [`SessionRegistry::next_id`] and are never
/// reused for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
