//! Abstract message channel to the game server.
//!
//! The connection task only needs four primitives: dial, send one frame,
//! receive the next frame (or the close notification) and close. Any
//! backend that can provide them plugs in through [`Connector`] and
//! [`Transport`]; the WebSocket backend lives in
//! [`websocket`](super::websocket).

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Incoming
// ============================================================================

/// Next notification from an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A text frame.
    Text(String),
    /// The remote end closed the channel.
    Closed {
        /// Close reason, if the peer supplied one.
        reason: Option<String>,
    },
}

// ============================================================================
// Transport
// ============================================================================

/// An open, bidirectional text-frame channel.
#[async_trait]
pub trait Transport: Send {
    /// Writes one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be handed to the socket.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Waits for the next frame or close notification.
    ///
    /// Must be cancel-safe: the connection task races it against timers and
    /// outbound commands in `tokio::select!`.
    ///
    /// # Errors
    ///
    /// Returns an error when the channel fails (reset, protocol violation).
    async fn recv(&mut self) -> Result<Incoming>;

    /// Closes the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake could not be written.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// Connector
// ============================================================================

/// Factory for [`Transport`]s, called once per (re)connect attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new transport to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is refused or times out.
    async fn connect(&self) -> Result<Box<dyn Transport>>;
}
