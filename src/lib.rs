//! Word Bomb addon client.
//!
//! This library connects an addon to the Word Bomb game server, registers
//! it, and turns the server's message stream into calls on application
//! handlers.
//!
//! # Architecture
//!
//! The client follows a handle/task model:
//!
//! - **[`Addon`] handle**: cloneable, sends commands, reads published state
//! - **Connection task**: owns the WebSocket, runs the handshake, routes
//!   inbound messages, reconnects with linear backoff
//!
//! Key design principles:
//!
//! - One background task per running addon
//! - Envelopes are `{e, d}` JSON text frames (see [`WireFormat`])
//! - Handlers are registered up front on the [`AddonBuilder`] and run in
//!   arrival order on the connection task
//! - Direct messages are correlated requests with a timeout
//!
//! # Quick Start
//!
//! ```no_run
//! use wordbomb_addon::{Addon, LifecycleKind, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let addon = Addon::builder()
//!         .token(std::env::var("WORDBOMB_TOKEN").unwrap_or_default())
//!         .name("Hyphen Champions")
//!         .command("hello", |addon, client, _args| {
//!             addon.send_chat(&client.id, format!("Hello, {}!", client.name));
//!         })
//!         .on(LifecycleKind::Ready, |_addon, event| println!("{event:?}"))
//!         .build()?;
//!
//!     addon.start();
//!     let _ = tokio::signal::ctrl_c().await;
//!     addon.stop().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`addon`] | [`Addon`] handle, builder and handler tables |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`manager`] | Connection state, backoff and client registry |
//! | [`protocol`] | Wire envelope and message types |
//! | [`transport`] | Transport traits and the WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Addon handle and configuration.
///
/// Use [`Addon::builder()`] to create a configured addon.
pub mod addon;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing client, addon and request IDs.
pub mod identifiers;

/// Connection manager.
///
/// State machine, reconnect policy and client registry.
pub mod manager;

/// Wire protocol message types.
pub mod protocol;

/// Transport layer.
///
/// [`Connector`] and [`Transport`] traits plus the WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Addon types
pub use addon::{Addon, AddonBuilder, AddonIdentity, LifecycleEvent, LifecycleKind};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{AddonId, ClientId, RequestId};

// Manager types
pub use manager::{ClientInfo, ClientSession, ConnectionState, ReconnectPolicy};

// Protocol types
pub use protocol::{Embed, WireFormat};

// Transport types
pub use transport::{Connector, Incoming, Transport, WebSocketConnector};
