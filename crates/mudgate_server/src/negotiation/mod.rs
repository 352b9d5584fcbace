//! Capability handshake performed right after a client connects.
//!
//! The server petitions the client for linemode and window-size reporting.
//! Every receive is time-boxed, and a silent or non-compliant client
//! degrades to default terminal settings instead of being rejected. The
//! result is always a [`NegotiationOutcome`]; handshake failures are never
//! surfaced to the caller as errors.

pub mod negotiator;
pub mod telnet;

pub use negotiator::{NegotiationState, Negotiator};
pub use telnet::WindowSize;

use std::time::Duration;

/// Why a single handshake step did not produce a usable reply.
///
/// These are internal to the negotiator and are folded into the outcome.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// The client did not reply within the bound
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// The reply did not match the expected pattern
    #[error("Malformed reply: {0}")]
    MalformedResponse(&'static str),

    /// The connection failed or was closed mid-handshake
    #[error("I/O error during negotiation: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one capability handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The client answered the linemode request and reported its window size
    Success { width: u16, height: u16 },
    /// Exactly one of the two steps succeeded
    PartialSuccess {
        linemode: bool,
        window: Option<WindowSize>,
    },
    /// Neither step succeeded; defaults apply
    Fallback,
}

impl NegotiationOutcome {
    /// Combines the results of the two handshake steps.
    pub fn from_steps(linemode: bool, window: Option<WindowSize>) -> Self {
        match (linemode, window) {
            (true, Some(size)) => Self::Success {
                width: size.width,
                height: size.height,
            },
            (false, None) => Self::Fallback,
            (linemode, window) => Self::PartialSuccess { linemode, window },
        }
    }

    pub fn linemode_enabled(&self) -> bool {
        match self {
            Self::Success { .. } => true,
            Self::PartialSuccess { linemode, .. } => *linemode,
            Self::Fallback => false,
        }
    }

    /// The window size reported by the client, if any.
    pub fn window_size(&self) -> Option<WindowSize> {
        match self {
            Self::Success { width, height } => Some(WindowSize {
                width: *width,
                height: *height,
            }),
            Self::PartialSuccess { window, .. } => *window,
            Self::Fallback => None,
        }
    }

    pub fn window_size_or(&self, default: WindowSize) -> WindowSize {
        self.window_size().unwrap_or(default)
    }
}
