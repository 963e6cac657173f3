//! Wire envelope and its two encodings.
//!
//! Every frame on the socket is a JSON object holding a discriminator and a
//! payload. Two field spellings exist in the wild:
//!
//! | Format | Frame |
//! |--------|-------|
//! | [`WireFormat::Compact`] | `{"e": "addon-send", "d": { ... }}` |
//! | [`WireFormat::Named`] | `{"event": "addon-send", "data": { ... }}` |
//!
//! The rest of the crate only sees [`Envelope`]; the format is chosen once
//! per connection and applied at the transport boundary.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Envelope
// ============================================================================

/// A decoded frame: message kind plus kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Message kind, e.g. `addon-result` or `client-register`.
    pub event: String,

    /// Kind-specific payload (`Null` when the frame carried none).
    pub data: Value,
}

impl Envelope {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

// ============================================================================
// WireFormat
// ============================================================================

/// Field spelling used for the envelope on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Single-letter fields `e` / `d` (the raw socket binding).
    #[default]
    Compact,
    /// Named fields `event` / `data`.
    Named,
}

impl WireFormat {
    /// Returns the discriminator and payload field names.
    #[inline]
    #[must_use]
    pub const fn fields(self) -> (&'static str, &'static str) {
        match self {
            Self::Compact => ("e", "d"),
            Self::Named => ("event", "data"),
        }
    }

    /// Encodes an envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    pub fn encode(self, envelope: &Envelope) -> Result<String> {
        let (event_key, data_key) = self.fields();
        let mut frame = Map::with_capacity(2);
        frame.insert(event_key.to_string(), Value::String(envelope.event.clone()));
        frame.insert(data_key.to_string(), envelope.data.clone());
        Ok(serde_json::to_string(&frame)?)
    }

    /// Decodes a text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for invalid JSON and [`Error::Protocol`] when
    /// the frame is not an object or has no string discriminator.
    pub fn decode(self, text: &str) -> Result<Envelope> {
        let (event_key, data_key) = self.fields();

        let Value::Object(mut frame) = serde_json::from_str::<Value>(text)? else {
            return Err(Error::protocol("frame is not a JSON object"));
        };

        let event = match frame.remove(event_key) {
            Some(Value::String(event)) => event,
            _ => {
                return Err(Error::protocol(format!(
                    "frame has no `{event_key}` discriminator"
                )));
            }
        };

        let data = frame.remove(data_key).unwrap_or(Value::Null);
        Ok(Envelope { event, data })
    }
}

// ============================================================================
// Tests
// ============================================================================
