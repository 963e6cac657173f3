//! Wire protocol message types.
//!
//! This module defines the frames exchanged between the addon (local end)
//! and the game server (remote end).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `addon-register` | Local → Remote | Registration handshake |
//! | `addon-result` | Remote → Local | Registration acknowledgement |
//! | `client-*` | Remote → Local | Client lifecycle |
//! | `event` | Remote → Local | Per-client commands and game events |
//! | `addon-send` / `addon-broadcast` | Local → Remote | Client-side events |
//! | `addon-dm` / `addon-dm-result` | Both | Direct message request/response |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound messages |
//! | `envelope` | Envelope and wire format adapter |
//! | `event` | Inbound message classification |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound message definitions.
pub mod command;

/// Envelope and field-spelling adapter.
pub mod envelope;

/// Inbound message types.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    AddressedSend, Broadcast, Command, DirectMessage, DirectMessageBody, Embed, Registration,
};
pub use envelope::{Envelope, WireFormat};
pub use event::{
    AddonResult, ClientEvent, ClientNotice, CommandInvocation, DirectMessageResult,
    InboundMessage, COMMAND_EVENT, GAME_EVENT_PREFIX,
};
