//! Addon registration identity.
//!
//! The descriptor announced to the server on every (re)connect.
//!
//! # Example
//!
//! ```
//! use wordbomb_addon::AddonIdentity;
//!
//! let identity = AddonIdentity::new("Hyphen Champions")
//!     .with_description("Track your hyphenated words")
//!     .with_welcome("<h3>Hyphen Champions</h3>")
//!     .with_permission("chat");
//!
//! assert!(!identity.practice);
//! assert_eq!(identity.permissions, vec!["chat"]);
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::Registration;

// ============================================================================
// Constants
// ============================================================================

/// Display name used when none is configured.
pub const DEFAULT_ADDON_NAME: &str = "My Addon";

// ============================================================================
// AddonIdentity
// ============================================================================

/// Registration descriptor, immutable once the addon is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonIdentity {
    /// Display name.
    pub name: String,

    /// Short description.
    pub description: String,

    /// Whether the addon is offered in practice rooms.
    pub practice: bool,

    /// Welcome text (HTML) shown to players.
    pub welcome: String,

    /// Declared permission names.
    pub permissions: Vec<String>,
}

impl Default for AddonIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_ADDON_NAME)
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl AddonIdentity {
    /// Creates an identity with a display name and default settings.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            practice: false,
            welcome: String::new(),
            permissions: Vec::new(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl AddonIdentity {
    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description.
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the practice-mode flag.
    #[inline]
    #[must_use]
    pub fn with_practice(mut self, practice: bool) -> Self {
        self.practice = practice;
        self
    }

    /// Sets the welcome text.
    #[inline]
    #[must_use]
    pub fn with_welcome(mut self, welcome: impl Into<String>) -> Self {
        self.welcome = welcome.into();
        self
    }

    /// Adds one permission.
    #[inline]
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Adds several permissions.
    #[inline]
    #[must_use]
    pub fn with_permissions(
        mut self,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }
}

// ============================================================================
// Conversion
// ============================================================================

impl AddonIdentity {
    /// Builds the `addon-register` payload.
    #[must_use]
    pub fn to_registration(&self, token: &str, commands: &[String]) -> Registration {
        Registration {
            token: token.to_string(),
            name: self.name.clone(),
            desc: self.description.clone(),
            practice: self.practice,
            welcome: self.welcome.clone(),
            commands: commands.to_vec(),
            permissions: self.permissions.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
