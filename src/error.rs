//! Error types for the addon client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wordbomb_addon::{Addon, Result};
//!
//! async fn notify(addon: &Addon, client: &ClientId) -> Result<()> {
//!     addon.send_discord_message(client, "You were promoted").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::NotConnected`], [`Error::ReconnectExhausted`] |
//! | Protocol | [`Error::Protocol`], [`Error::RegistrationRejected`] |
//! | Requests | [`Error::DirectMessage`], [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`AddonBuilder::build`](crate::AddonBuilder::build) when
    /// the addon configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport connection failed.
    ///
    /// Returned when the socket cannot be opened or fails mid-session.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection was torn down while a request was outstanding.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation requires a registered (Ready) connection.
    #[error("No connection")]
    NotConnected,

    /// Reconnect attempts exhausted.
    ///
    /// Terminal: the connection task stops until [`Addon::start`](crate::Addon::start)
    /// is called again.
    #[error("Max reconnect attempts reached ({attempts})")]
    ReconnectExhausted {
        /// Number of consecutive attempts made.
        attempts: u32,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Server declined the addon registration.
    #[error("Registration rejected: {reason}")]
    RegistrationRejected {
        /// Reason supplied by the server.
        reason: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// Direct message delivery failed on the server side.
    #[error("Direct message failed: {detail}")]
    DirectMessage {
        /// Error detail reported by the server.
        detail: String,
    },

    /// Direct message request timed out.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a registration rejected error.
    #[inline]
    pub fn registration_rejected(reason: impl Into<String>) -> Self {
        Self::RegistrationRejected {
            reason: reason.into(),
        }
    }

    /// Creates a direct message failure.
    #[inline]
    pub fn direct_message(detail: impl Into<String>) -> Self {
        Self::DirectMessage {
            detail: detail.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error ends the connection task for good.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ReconnectExhausted { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
