//! Connection state machine.
//!
//! ```text
//! Disconnected ──► Connecting ──► Handshaking ──► Ready
//!      ▲               │               │            │
//!      └───────────────┴───────────────┴────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the single connection owned by the connection task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport; either idle, stopped, or waiting out a backoff delay.
    #[default]
    Disconnected,
    /// Dialing the server.
    Connecting,
    /// Transport open, registration sent, waiting for `addon-result`.
    Handshaking,
    /// Registration acknowledged; normal traffic flows.
    Ready,
}

impl ConnectionState {
    /// Returns `true` if `self -> next` is a valid transition.
    ///
    /// A transition to the current state counts as valid (no-op).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Disconnected | Self::Connecting)
                | (Self::Connecting, Self::Connecting | Self::Handshaking | Self::Disconnected)
                | (Self::Handshaking, Self::Handshaking | Self::Ready | Self::Disconnected)
                | (Self::Ready, Self::Ready | Self::Disconnected)
        )
    }

    /// Returns `true` when outbound traffic may be sent.
    #[inline]
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
