//! Type-safe identifier wrappers.
//!
//! The server hands out opaque identifiers for clients and for the addon
//! itself. They arrive as JSON strings or numbers; both forms are kept
//! verbatim so they can be echoed back unchanged in outbound envelopes.
//!
//! | Type | Origin |
//! |------|--------|
//! | [`ClientId`] | Server, per connected player |
//! | [`AddonId`] | Server, per successful registration |
//! | [`RequestId`] | Local, per direct-message request |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Number;

// ============================================================================
// RawId
// ============================================================================

/// Wire representation shared by server-assigned identifiers.
///
/// Any JSON number is accepted, including negative and fractional ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(Number),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// ClientId
// ============================================================================

/// Server-assigned identifier of a remote player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(RawId);

impl ClientId {
    /// Creates a client ID from its string form.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(RawId::Text(id.into()))
    }

    /// Creates a client ID from its numeric form.
    #[inline]
    #[must_use]
    pub fn from_number(id: u64) -> Self {
        Self(RawId::Number(id.into()))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<u64> for ClientId {
    fn from(id: u64) -> Self {
        Self::from_number(id)
    }
}

// ============================================================================
// AddonId
// ============================================================================

/// Server-assigned identifier of this addon, valid for one registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddonId(RawId);

impl AddonId {
    /// Creates an addon ID from its string form.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(RawId::Text(id.into()))
    }
}

impl fmt::Display for AddonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Process-wide counter backing [`RequestId::next`].
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Local identifier of one outstanding direct-message request.
///
/// Ordered: a smaller ID was issued earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw request number.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Issues the next monotonically increasing request ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw request number.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
