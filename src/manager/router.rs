//! Inbound message routing.
//!
//! Every classified message except the registration acknowledgement goes to
//! exactly one destination:
//!
//! | Message | Destination |
//! |---------|-------------|
//! | `client-register` / `client-connect` | registry upsert, then lifecycle handler |
//! | `client-unregister` / `client-disconnect` | registry remove, then lifecycle handler |
//! | `event` with inner `command` | command table |
//! | `event`, anything else | event table (game prefix stripped) |
//! | `addon-dm-result` | correlator |
//!
//! Unknown names and clients are dropped without error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::addon::{Addon, Handlers, LifecycleEvent};
use crate::protocol::{ClientEvent, ClientNotice, InboundMessage};

use super::correlator::Correlator;
use super::registry::ClientInfo;

// ============================================================================
// EventRouter
// ============================================================================

/// Dispatches inbound messages to handlers, the registry and the correlator.
pub(crate) struct EventRouter {
    handlers: Arc<Handlers>,
    correlator: Correlator,
}

impl EventRouter {
    /// Creates a router over frozen handler tables.
    pub(crate) fn new(handlers: Arc<Handlers>) -> Self {
        Self {
            handlers,
            correlator: Correlator::new(),
        }
    }

    /// The handler tables.
    #[inline]
    pub(crate) fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// The direct-message correlator.
    #[inline]
    pub(crate) fn correlator(&mut self) -> &mut Correlator {
        &mut self.correlator
    }

    /// Routes one message. Handlers run synchronously, in arrival order.
    pub(crate) fn dispatch(&mut self, addon: &Addon, message: InboundMessage) {
        match message {
            InboundMessage::ClientRegister(notice) => {
                let (client, session) = Self::upsert(addon, notice);
                self.handlers
                    .emit(addon, &LifecycleEvent::Register { client, session });
            }

            InboundMessage::ClientConnect(notice) => {
                let (client, session) = Self::upsert(addon, notice);
                self.handlers
                    .emit(addon, &LifecycleEvent::Connect { client, session });
            }

            InboundMessage::ClientUnregister(notice) => {
                let client = Self::remove(addon, notice);
                self.handlers
                    .emit(addon, &LifecycleEvent::Unregister { client });
            }

            InboundMessage::ClientDisconnect(notice) => {
                let client = Self::remove(addon, notice);
                self.handlers
                    .emit(addon, &LifecycleEvent::Disconnect { client });
            }

            InboundMessage::ClientEvent(event) => self.dispatch_client_event(addon, event),

            InboundMessage::DirectMessageResult(result) => {
                self.correlator.resolve(result);
            }

            InboundMessage::AddonResult(_) => {
                warn!("Registration acknowledgement reached the router, ignoring");
            }

            InboundMessage::Unknown { event } => {
                trace!(%event, "Ignoring unknown message kind");
            }
        }
    }

    /// Routes a per-client `event` envelope.
    fn dispatch_client_event(&self, addon: &Addon, event: ClientEvent) {
        // Clone out so handlers can read the registry themselves.
        let Some(client) = addon.inner.registry.read().get(&event.client).cloned() else {
            debug!(client_id = %event.client, event = %event.event, "Event for unknown client, dropping");
            return;
        };

        if event.is_command() {
            let Some(invocation) = event.command() else {
                debug!(client_id = %client.id, "Malformed command payload, dropping");
                return;
            };

            match self.handlers.command(&invocation.command) {
                Some(handler) => {
                    debug!(client_id = %client.id, command = %invocation.command, "Dispatching command");
                    handler(addon, &client, &invocation.args);
                }
                None => trace!(command = %invocation.command, "No handler for command"),
            }
            return;
        }

        let name = event.handler_name();
        match self.handlers.event(name) {
            Some(handler) => {
                trace!(client_id = %client.id, event = %name, "Dispatching event");
                handler(addon, &event.data, &client);
            }
            None => trace!(event = %name, "No handler for event"),
        }
    }

    fn upsert(addon: &Addon, notice: ClientNotice) -> (ClientInfo, Option<serde_json::Value>) {
        let ClientNotice { id, name, session } = notice;
        addon
            .inner
            .registry
            .write()
            .upsert(id.clone(), name.clone(), session.clone());
        debug!(client_id = %id, %name, "Client registered");
        (ClientInfo { id, name }, session)
    }

    fn remove(addon: &Addon, notice: ClientNotice) -> ClientInfo {
        let ClientNotice { id, name, .. } = notice;
        addon.inner.registry.write().remove(&id);
        debug!(client_id = %id, "Client removed");
        ClientInfo { id, name }
    }
}
