//! # mudgate server - network front-end for a text game server
//!
//! This crate accepts telnet clients, negotiates their terminal
//! capabilities and publishes every live connection into a shared session
//! registry that the rest of the game reads and mutates. A separate
//! side-channel answers unauthenticated stats requests.
//!
//! ## Architecture Overview
//!
//! * **Negotiator** - time-boxed linemode and window-size handshake
//! * **Session Registry** - mutex-guarded table of connected sessions
//! * **Connection Acceptor** - accept loop feeding the negotiator and registry
//! * **Stats Service** - one-line `<uptime>:<names>` answer per connection
//! * **Registry Monitor** - periodic removal of sessions whose peer closed
//!
//! Data flows one way: acceptor → negotiator → registry. The stats service
//! only reads the registry.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), mudgate_server::ServerError> {
//! use mudgate_server::{MudServer, ServerConfig};
//!
//! let server = MudServer::bind(ServerConfig::default())?;
//! let registry = server.registry();
//! let handle = server.start();
//!
//! // The game layer reads the registry and removes sessions on disconnect.
//! for session in registry.snapshot().await {
//!     println!("{} is {}x{}", session.id(), session.width(), session.height());
//! }
//!
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! [`ServerError::Bind`] is the only error that escapes to startup. Every
//! per-connection failure is logged by the loop that produced it, and
//! handshake failures degrade to default terminal settings.

pub use config::{NegotiationConfig, ServerConfig, StatsConfig, UptimeFormat};
pub use error::ServerError;
pub use negotiation::{NegotiationOutcome, Negotiator, WindowSize};
pub use server::{MudServer, ServerHandle};
pub use session::{RegistryEvent, Session, SessionId, SessionRegistry};

pub mod config;
pub mod error;
pub mod negotiation;
pub mod server;
pub mod session;
