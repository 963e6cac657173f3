//! Inbound messages from the server to the addon.
//!
//! Classification is by the envelope discriminator:
//!
//! | Kind | Parsed as |
//! |------|-----------|
//! | `addon-result` | [`InboundMessage::AddonResult`] |
//! | `client-register` / `client-connect` | [`InboundMessage::ClientRegister`] / [`InboundMessage::ClientConnect`] |
//! | `client-unregister` / `client-disconnect` | [`InboundMessage::ClientUnregister`] / [`InboundMessage::ClientDisconnect`] |
//! | `event` | [`InboundMessage::ClientEvent`] |
//! | `addon-dm-result` | [`InboundMessage::DirectMessageResult`] |
//!
//! Anything else is [`InboundMessage::Unknown`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identifiers::{AddonId, ClientId};

use super::Envelope;

// ============================================================================
// Constants
// ============================================================================

/// Prefix marking game events (`g:submit`) as opposed to addon events.
pub const GAME_EVENT_PREFIX: &str = "g:";

/// Inner event name carrying a slash-command invocation.
pub const COMMAND_EVENT: &str = "command";

// ============================================================================
// InboundMessage
// ============================================================================

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Registration acknowledgement.
    AddonResult(AddonResult),
    /// A client registered with the addon.
    ClientRegister(ClientNotice),
    /// A client unregistered from the addon.
    ClientUnregister(ClientNotice),
    /// A registered client (re)connected.
    ClientConnect(ClientNotice),
    /// A registered client disconnected.
    ClientDisconnect(ClientNotice),
    /// Per-client event envelope (commands and game events).
    ClientEvent(ClientEvent),
    /// Outcome of the oldest outstanding direct message.
    DirectMessageResult(DirectMessageResult),
    /// Unrecognized message kind.
    Unknown {
        /// The unrecognized discriminator.
        event: String,
    },
}

impl InboundMessage {
    /// Classifies a decoded envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) when a known message kind
    /// carries a payload of the wrong shape. A `null` payload reads as an
    /// empty object.
    pub fn classify(envelope: Envelope) -> Result<Self> {
        let Envelope { event, data } = envelope;
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let message = match event.as_str() {
            "addon-result" => Self::AddonResult(serde_json::from_value(data)?),
            "client-register" => Self::ClientRegister(serde_json::from_value(data)?),
            "client-unregister" => Self::ClientUnregister(serde_json::from_value(data)?),
            "client-connect" => Self::ClientConnect(serde_json::from_value(data)?),
            "client-disconnect" => Self::ClientDisconnect(serde_json::from_value(data)?),
            "event" => Self::ClientEvent(serde_json::from_value(data)?),
            "addon-dm-result" => Self::DirectMessageResult(serde_json::from_value(data)?),
            _ => Self::Unknown { event },
        };

        Ok(message)
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload of `addon-result`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddonResult {
    /// Whether the registration was accepted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    /// Addon identifier, present when accepted.
    #[serde(default)]
    pub id: Option<AddonId>,
    /// Rejection reason, present when declined.
    #[serde(default)]
    pub err: Option<String>,
}

/// Payload of the four client lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientNotice {
    /// Client identifier.
    pub id: ClientId,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Opaque session token (register/connect only).
    #[serde(default)]
    pub session: Option<Value>,
}

/// Payload of `addon-dm-result`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectMessageResult {
    /// Whether delivery succeeded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    /// Failure detail.
    #[serde(default)]
    pub err: Option<String>,
}

/// Reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// ClientEvent
// ============================================================================

/// Payload of the per-client `event` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientEvent {
    /// Addressed client.
    pub client: ClientId,
    /// Inner event name (`command`, `g:submit`, ...).
    pub event: String,
    /// Inner event payload.
    #[serde(default)]
    pub data: Value,
}

/// A slash-command invocation carried by a `command` client event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Command name without prefix.
    pub command: String,
    /// Raw argument string, empty when absent.
    pub args: String,
}

#[derive(Deserialize)]
struct RawInvocation {
    command: String,
    #[serde(default)]
    args: Option<String>,
}

impl ClientEvent {
    /// Returns `true` if this event carries a slash-command.
    #[inline]
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.event == COMMAND_EVENT
    }

    /// Parses the command invocation, if this is a well-formed command event.
    #[must_use]
    pub fn command(&self) -> Option<CommandInvocation> {
        if !self.is_command() {
            return None;
        }

        let raw = RawInvocation::deserialize(&self.data).ok()?;
        Some(CommandInvocation {
            command: raw.command,
            args: raw.args.unwrap_or_default(),
        })
    }

    /// Returns the event-table lookup name, with the game prefix stripped.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // "g:wordSubmitted" -> "wordSubmitted", "ready" -> "ready"
    /// ```
    #[inline]
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.event
            .strip_prefix(GAME_EVENT_PREFIX)
            .unwrap_or(&self.event)
    }
}

// ============================================================================
// Tests
// ============================================================================
