//! Client registry: the addon's cache of players the server told it about.
//!
//! Written only by the event router, read by anyone through
//! [`Addon::clients`](crate::Addon::clients). Cleared whenever the
//! connection drops, since client identifiers are not stable across
//! reconnects.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::ClientId;

// ============================================================================
// ClientSession
// ============================================================================

/// One remote player currently known to the addon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSession {
    /// Server-assigned identifier.
    pub id: ClientId,
    /// Display name.
    pub name: String,
    /// Opaque session token from the last register/connect notification.
    pub session: Option<Value>,
}

impl ClientSession {
    /// Returns the minimal (id, name) descriptor.
    #[inline]
    #[must_use]
    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Minimal client descriptor passed to lifecycle handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClientInfo {
    /// Server-assigned identifier.
    pub id: ClientId,
    /// Display name.
    pub name: String,
}

// ============================================================================
// ClientRegistry
// ============================================================================

/// Insertion-ordered map of [`ClientId`] to [`ClientSession`].
#[derive(Debug, Default)]
pub struct ClientRegistry {
    sessions: FxHashMap<ClientId, ClientSession>,
    order: Vec<ClientId>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new session or updates name and token of a known one.
    ///
    /// A known client keeps its original position in [`list`](Self::list).
    pub fn upsert(&mut self, id: ClientId, name: String, session: Option<Value>) {
        if let Some(existing) = self.sessions.get_mut(&id) {
            existing.name = name;
            existing.session = session;
            return;
        }

        self.order.push(id.clone());
        self.sessions.insert(id.clone(), ClientSession { id, name, session });
    }

    /// Removes a session. Unknown IDs are ignored.
    pub fn remove(&mut self, id: &ClientId) -> Option<ClientSession> {
        let removed = self.sessions.remove(id)?;
        self.order.retain(|known| known != id);
        Some(removed)
    }

    /// Looks up a session.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ClientId) -> Option<&ClientSession> {
        self.sessions.get(id)
    }

    /// Returns all sessions in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<ClientSession> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .cloned()
            .collect()
    }

    /// Drops every session.
    #[inline]
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.order.clear();
    }

    /// Number of known sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are known.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
