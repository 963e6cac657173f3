//! Transport layer.
//!
//! This module abstracts the socket between the addon (local end) and the
//! game server (remote end), so the connection task can be driven by any
//! backend, including in-memory ones in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Addon (Rust)   │                              │  Game server    │
//! │                 │         WebSocket            │                 │
//! │  Connector      │─────────────────────────────►│                 │
//! │  → Transport    │◄────────────────────────────►│                 │
//! │                 │    wss://ws.wordbomb.io      │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | `Connector` / `Transport` traits |
//! | `websocket` | tokio-tungstenite backend |

// ============================================================================
// Submodules
// ============================================================================

/// Abstract transport traits.
pub mod channel;

/// WebSocket transport backend.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Connector, Incoming, Transport};
pub use websocket::{WebSocketConnector, WebSocketTransport};
