//! Outbound messages from the addon to the server.
//!
//! # Commands
//!
//! | Kind | Payload |
//! |------|---------|
//! | `addon-register` | [`Registration`] |
//! | `addon-send` | [`AddressedSend`] |
//! | `addon-broadcast` | [`Broadcast`] |
//! | `addon-dm` | [`DirectMessage`] |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::identifiers::ClientId;

use super::Envelope;

// ============================================================================
// Command
// ============================================================================

/// All messages the addon can send.
#[derive(Debug, Clone)]
pub enum Command {
    /// Announce the addon and its command set.
    Register(Registration),
    /// Deliver an event to one client.
    Send(AddressedSend),
    /// Deliver an event to every client.
    Broadcast(Broadcast),
    /// Ask the server to forward a direct message (answered by `addon-dm-result`).
    DirectMessage(DirectMessage),
}

impl Command {
    /// Returns the wire discriminator for this command.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Register(_) => "addon-register",
            Self::Send(_) => "addon-send",
            Self::Broadcast(_) => "addon-broadcast",
            Self::DirectMessage(_) => "addon-dm",
        }
    }

    /// Wraps the command payload in an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload fails to serialize.
    pub fn into_envelope(self) -> Result<Envelope> {
        let kind = self.kind();
        let data = match self {
            Self::Register(payload) => serde_json::to_value(payload)?,
            Self::Send(payload) => serde_json::to_value(payload)?,
            Self::Broadcast(payload) => serde_json::to_value(payload)?,
            Self::DirectMessage(payload) => serde_json::to_value(payload)?,
        };
        Ok(Envelope::new(kind, data))
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Registration payload, re-sent verbatim on every (re)connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Addon token issued by the server operator.
    pub token: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub desc: String,
    /// Whether the addon runs in practice rooms.
    pub practice: bool,
    /// Welcome text shown to players.
    pub welcome: String,
    /// Command names without the `/` prefix.
    pub commands: Vec<String>,
    /// Declared permission names.
    pub permissions: Vec<String>,
}

// ============================================================================
// AddressedSend / Broadcast
// ============================================================================

/// An event addressed to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressedSend {
    /// Target client.
    pub to: ClientId,
    /// Client-side event name (`chat`, `embed`, ...).
    pub event: String,
    /// Event payload.
    pub data: Value,
}

/// An event sent to every client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    /// Client-side event name.
    pub event: String,
    /// Event payload.
    pub data: Value,
}

// ============================================================================
// DirectMessage
// ============================================================================

/// A direct message routed through the server's chat bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Target client.
    pub to: ClientId,
    /// Text or file body.
    #[serde(flatten)]
    pub body: DirectMessageBody,
}

/// Body of a [`DirectMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectMessageBody {
    /// Attached file.
    File {
        /// File name shown to the recipient.
        #[serde(rename = "fileName")]
        file_name: String,
        /// File contents.
        #[serde(rename = "fileContent")]
        file_content: String,
    },
    /// Plain text.
    Text {
        /// Message text.
        message: String,
    },
}

// ============================================================================
// Embed
// ============================================================================

/// Structured notification panel rendered by the game client.
///
/// # Example
///
/// ```
/// use wordbomb_addon::protocol::Embed;
///
/// let embed = Embed::new("Top players")
///     .icon("👑")
///     .content("1. Ann")
///     .color("#f59e0b");
/// assert_eq!(embed.title, "Top players");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    /// Optional leading icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Panel title.
    pub title: String,
    /// Panel body, newline separated.
    pub content: String,
    /// Accent color as CSS hex string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Embed {
    /// Creates an embed with a title and empty content.
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sets the icon.
    #[inline]
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the body text.
    #[inline]
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets the accent color.
    #[inline]
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Payload of the client-side `chat` event.
#[inline]
#[must_use]
pub(crate) fn chat_payload(message: impl Into<String>) -> Value {
    json!({ "message": message.into() })
}

// ============================================================================
// Tests
// ============================================================================
