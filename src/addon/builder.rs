//! Builder pattern for addon configuration.
//!
//! Provides a fluent API for configuring and creating [`Addon`] instances.
//! Handlers are registered here, before the connection starts, and are
//! frozen by [`AddonBuilder::build`].
//!
//! # Example
//!
//! ```no_run
//! use wordbomb_addon::Addon;
//!
//! # fn example() -> wordbomb_addon::Result<()> {
//! let addon = Addon::builder()
//!     .token("secret-token")
//!     .name("Hyphen Champions")
//!     .description("Track your hyphenated words")
//!     .command("/hyphens", |addon, client, _args| {
//!         addon.send_chat(&client.id, "0 hyphens so far");
//!     })
//!     .on_event("submit", |_addon, data, client| {
//!         println!("{} submitted {}", client.name, data["word"]);
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::manager::{ClientSession, ReconnectPolicy};
use crate::protocol::WireFormat;
use crate::transport::{Connector, WebSocketConnector};

use super::core::{Addon, LaunchConfig};
use super::handlers::{Handlers, LifecycleEvent, LifecycleKind};
use super::identity::AddonIdentity;

// ============================================================================
// Constants
// ============================================================================

/// Production server URL.
pub const DEFAULT_SERVER_URL: &str = "wss://ws.wordbomb.io";

/// Default timeout for direct-message requests.
pub const DEFAULT_DM_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// AddonBuilder
// ============================================================================

/// Builder for configuring an [`Addon`] instance.
///
/// Use [`Addon::builder()`] to create a new builder.
pub struct AddonBuilder {
    /// Addon token.
    token: Option<String>,
    /// Server URL, used when no custom connector is set.
    url: String,
    /// Registration descriptor.
    identity: AddonIdentity,
    /// Handler tables.
    handlers: Handlers,
    /// Reconnect schedule.
    policy: ReconnectPolicy,
    /// Envelope field spelling.
    format: WireFormat,
    /// Direct-message timeout.
    dm_timeout: Duration,
    /// Custom transport factory.
    connector: Option<Arc<dyn Connector>>,
}

impl Default for AddonBuilder {
    fn default() -> Self {
        Self {
            token: None,
            url: DEFAULT_SERVER_URL.to_string(),
            identity: AddonIdentity::default(),
            handlers: Handlers::default(),
            policy: ReconnectPolicy::default(),
            format: WireFormat::default(),
            dm_timeout: DEFAULT_DM_TIMEOUT,
            connector: None,
        }
    }
}

impl fmt::Debug for AddonBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonBuilder")
            .field("url", &self.url)
            .field("identity", &self.identity)
            .field("handlers", &self.handlers)
            .field("policy", &self.policy)
            .field("format", &self.format)
            .field("dm_timeout", &self.dm_timeout)
            .field("custom_connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AddonBuilder - Identity
// ============================================================================

impl AddonBuilder {
    /// Creates a new builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the addon token (required).
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the server URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replaces the whole registration identity.
    #[inline]
    #[must_use]
    pub fn identity(mut self, identity: AddonIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.identity = self.identity.with_name(name);
        self
    }

    /// Sets the description.
    #[inline]
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.identity = self.identity.with_description(description);
        self
    }

    /// Sets the practice-mode flag.
    #[inline]
    #[must_use]
    pub fn practice(mut self, practice: bool) -> Self {
        self.identity = self.identity.with_practice(practice);
        self
    }

    /// Sets the welcome text.
    #[inline]
    #[must_use]
    pub fn welcome(mut self, welcome: impl Into<String>) -> Self {
        self.identity = self.identity.with_welcome(welcome);
        self
    }

    /// Adds a declared permission.
    #[inline]
    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.identity = self.identity.with_permission(permission);
        self
    }
}

// ============================================================================
// AddonBuilder - Handlers
// ============================================================================

impl AddonBuilder {
    /// Registers a slash-command handler.
    ///
    /// The name may be given with or without its leading `/`. Registered
    /// names are announced to the server in registration order.
    #[must_use]
    pub fn command<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Addon, &ClientSession, &str) + Send + Sync + 'static,
    {
        self.handlers.insert_command(name, Box::new(handler));
        self
    }

    /// Registers a named event handler.
    ///
    /// Game events arrive as `g:<name>` and are matched on `<name>`.
    #[must_use]
    pub fn on_event<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Addon, &Value, &ClientSession) + Send + Sync + 'static,
    {
        self.handlers.insert_event(name, Box::new(handler));
        self
    }

    /// Registers the handler for one lifecycle notification.
    #[must_use]
    pub fn on<F>(mut self, kind: LifecycleKind, handler: F) -> Self
    where
        F: Fn(&Addon, &LifecycleEvent) + Send + Sync + 'static,
    {
        self.handlers.insert_lifecycle(kind, Box::new(handler));
        self
    }
}

// ============================================================================
// AddonBuilder - Connection
// ============================================================================

impl AddonBuilder {
    /// Sets the reconnect schedule.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the envelope field spelling.
    #[inline]
    #[must_use]
    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the direct-message timeout.
    #[inline]
    #[must_use]
    pub fn dm_timeout(mut self, dm_timeout: Duration) -> Self {
        self.dm_timeout = dm_timeout;
        self
    }

    /// Uses a custom transport instead of dialing [`url`](Self::url).
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the addon with validation. Does not connect.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the token is missing or empty
    /// - [`Error::Config`] if the URL is invalid or not `ws`/`wss`
    pub fn build(self) -> Result<Addon> {
        let token = self.validate_token()?;
        let connector = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WebSocketConnector::new(Self::validate_url(&self.url)?)),
        };

        let registration = self
            .identity
            .to_registration(&token, self.handlers.command_names());

        let launch = LaunchConfig {
            connector,
            handlers: Arc::new(self.handlers),
            registration,
            policy: self.policy,
            format: self.format,
        };

        Ok(Addon::from_launch(launch, self.dm_timeout))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl AddonBuilder {
    /// Validates the token configuration.
    fn validate_token(&self) -> Result<String> {
        let token = self.token.clone().ok_or_else(|| {
            Error::config(
                "Addon token is required. Use .token() to set it.\n\
                 Example: Addon::builder().token(std::env::var(\"ADDON_TOKEN\")?)",
            )
        })?;

        if token.trim().is_empty() {
            return Err(Error::config("Addon token must not be empty"));
        }

        Ok(token)
    }

    /// Validates the server URL.
    fn validate_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid server URL {raw:?}: {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Server URL must use ws:// or wss://, got {scheme}://"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
