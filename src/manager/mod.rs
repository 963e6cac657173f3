//! Connection manager.
//!
//! Everything between the transport and the application handlers:
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnect schedule |
//! | `connection` | The connection task and its command channel |
//! | `correlator` | Direct-message request/result matching |
//! | `registry` | Known clients |
//! | `router` | Inbound message dispatch |
//! | `state` | Connection state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect-with-backoff policy.
pub mod backoff;

/// Connection task.
pub(crate) mod connection;

/// Direct-message correlation.
pub(crate) mod correlator;

/// Client registry.
pub mod registry;

/// Inbound routing.
pub(crate) mod router;

/// Connection state machine.
pub mod state;

#[cfg(test)]
mod tests;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::{Backoff, ReconnectPolicy};
pub use registry::{ClientInfo, ClientRegistry, ClientSession};
pub use state::ConnectionState;

pub(crate) use connection::{ConnectionTask, ManagerCommand};
