//! Handler tables consulted by the event router.
//!
//! Three tables, all filled on the [`AddonBuilder`](super::AddonBuilder)
//! and frozen once the addon is built:
//!
//! | Table | Key | Handler receives |
//! |-------|-----|------------------|
//! | commands | command name | `(&Addon, &ClientSession, &str args)` |
//! | events | event name, game prefix stripped | `(&Addon, &Value payload, &ClientSession)` |
//! | lifecycle | [`LifecycleKind`] | `(&Addon, &LifecycleEvent)` |
//!
//! Every handler gets the [`Addon`] handle so it can reply.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::AddonId;
use crate::manager::{ClientInfo, ClientSession};

use super::core::Addon;

// ============================================================================
// Types
// ============================================================================

/// Slash-command handler.
pub type CommandHandler = Box<dyn Fn(&Addon, &ClientSession, &str) + Send + Sync>;

/// Named game-event handler.
pub type EventHandler = Box<dyn Fn(&Addon, &Value, &ClientSession) + Send + Sync>;

/// Lifecycle notification handler.
pub type LifecycleHandler = Box<dyn Fn(&Addon, &LifecycleEvent) + Send + Sync>;

// ============================================================================
// LifecycleKind
// ============================================================================

/// Names of the lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// Transport opened, registration about to be sent.
    Connected,
    /// Registration acknowledged.
    Ready,
    /// A client registered.
    Register,
    /// A client unregistered.
    Unregister,
    /// A client connected.
    Connect,
    /// A client disconnected.
    Disconnect,
    /// Transport closed or failed; a reconnect is scheduled.
    Offline,
    /// Registration rejected, or reconnect attempts exhausted.
    Error,
}

impl LifecycleKind {
    /// All lifecycle kinds.
    pub const ALL: [Self; 8] = [
        Self::Connected,
        Self::Ready,
        Self::Register,
        Self::Unregister,
        Self::Connect,
        Self::Disconnect,
        Self::Offline,
        Self::Error,
    ];

    /// Returns the lifecycle name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Ready => "ready",
            Self::Register => "register",
            Self::Unregister => "unregister",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::config(format!("Unknown lifecycle event: {s}")))
    }
}

// ============================================================================
// LifecycleEvent
// ============================================================================

/// A lifecycle notification with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Transport opened.
    Connected,
    /// Registration acknowledged.
    Ready {
        /// Identifier assigned by the server.
        addon_id: Option<AddonId>,
    },
    /// A client registered.
    Register {
        /// The client.
        client: ClientInfo,
        /// Opaque session token.
        session: Option<Value>,
    },
    /// A client unregistered.
    Unregister {
        /// The client.
        client: ClientInfo,
    },
    /// A client connected.
    Connect {
        /// The client.
        client: ClientInfo,
        /// Opaque session token.
        session: Option<Value>,
    },
    /// A client disconnected.
    Disconnect {
        /// The client.
        client: ClientInfo,
    },
    /// Transport closed.
    Offline {
        /// Close reason.
        reason: String,
    },
    /// Registration rejected or reconnects exhausted.
    Error {
        /// Error text.
        message: String,
        /// `true` when the connection task has given up.
        fatal: bool,
    },
}

impl LifecycleEvent {
    /// Returns the kind used for handler lookup.
    #[must_use]
    pub const fn kind(&self) -> LifecycleKind {
        match self {
            Self::Connected => LifecycleKind::Connected,
            Self::Ready { .. } => LifecycleKind::Ready,
            Self::Register { .. } => LifecycleKind::Register,
            Self::Unregister { .. } => LifecycleKind::Unregister,
            Self::Connect { .. } => LifecycleKind::Connect,
            Self::Disconnect { .. } => LifecycleKind::Disconnect,
            Self::Offline { .. } => LifecycleKind::Offline,
            Self::Error { .. } => LifecycleKind::Error,
        }
    }

    /// Builds the `error` notification for a task-level failure.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        Self::Error {
            message: err.to_string(),
            fatal: err.is_fatal(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// The three handler tables.
#[derive(Default)]
pub struct Handlers {
    commands: FxHashMap<String, CommandHandler>,
    command_order: Vec<String>,
    events: FxHashMap<String, EventHandler>,
    lifecycle: FxHashMap<LifecycleKind, LifecycleHandler>,
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("commands", &self.command_order)
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("lifecycle", &self.lifecycle.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Handlers {
    /// Registers a command handler, replacing any previous one.
    ///
    /// A leading `/` is stripped from the name.
    pub(crate) fn insert_command(&mut self, name: &str, handler: CommandHandler) {
        let name = name.strip_prefix('/').unwrap_or(name).to_string();
        if !self.commands.contains_key(&name) {
            self.command_order.push(name.clone());
        }
        self.commands.insert(name, handler);
    }

    /// Registers an event handler, replacing any previous one.
    pub(crate) fn insert_event(&mut self, name: impl Into<String>, handler: EventHandler) {
        self.events.insert(name.into(), handler);
    }

    /// Registers a lifecycle handler, replacing any previous one.
    pub(crate) fn insert_lifecycle(&mut self, kind: LifecycleKind, handler: LifecycleHandler) {
        self.lifecycle.insert(kind, handler);
    }

    /// Command names in registration order, as announced to the server.
    #[inline]
    #[must_use]
    pub fn command_names(&self) -> &[String] {
        &self.command_order
    }

    /// Looks up a command handler.
    #[inline]
    #[must_use]
    pub fn command(&self, name: &str) -> Option<&CommandHandler> {
        self.commands.get(name)
    }

    /// Looks up an event handler.
    #[inline]
    #[must_use]
    pub fn event(&self, name: &str) -> Option<&EventHandler> {
        self.events.get(name)
    }

    /// Invokes the handler for a lifecycle notification, if one is registered.
    pub(crate) fn emit(&self, addon: &Addon, event: &LifecycleEvent) {
        let kind = event.kind();
        match self.lifecycle.get(&kind) {
            Some(handler) => handler(addon, event),
            None => trace!(%kind, "No lifecycle handler registered"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
