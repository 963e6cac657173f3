//! The addon handle.
//!
//! [`Addon`] is a cheap, cloneable handle. The connection itself lives in a
//! background task spawned by [`Addon::start`]; the handle reaches it through
//! a command channel and reads the state it publishes (connection state,
//! client registry, addon ID).
//!
//! Handles created by the builder own the command channel. The connection
//! task and the handlers it calls only hold a non-owning handle, so dropping
//! every owning handle closes the channel and the task shuts down.
//!
//! # Example
//!
//! ```no_run
//! use wordbomb_addon::{Addon, Embed};
//!
//! # async fn example() -> wordbomb_addon::Result<()> {
//! let addon = Addon::builder()
//!     .token("secret-token")
//!     .name("Hyphen Champions")
//!     .command("top", |addon, client, _args| {
//!         addon.send_embed(&client.id, &Embed::new("Top players"));
//!     })
//!     .build()?;
//!
//! addon.start();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{AddonId, ClientId, RequestId};
use crate::manager::{
    ClientRegistry, ClientSession, ConnectionState, ConnectionTask, ManagerCommand,
    ReconnectPolicy,
};
use crate::protocol::command::chat_payload;
use crate::protocol::{
    AddressedSend, Broadcast, Command, DirectMessage, DirectMessageBody, Embed, Registration,
    WireFormat,
};
use crate::transport::Connector;

use super::builder::AddonBuilder;
use super::handlers::Handlers;

// ============================================================================
// Types
// ============================================================================

/// Everything the connection task needs, fixed at build time.
pub(crate) struct LaunchConfig {
    /// Transport factory.
    pub connector: Arc<dyn Connector>,
    /// Frozen handler tables.
    pub handlers: Arc<Handlers>,
    /// Registration payload, re-sent on every connect.
    pub registration: Registration,
    /// Reconnect schedule.
    pub policy: ReconnectPolicy,
    /// Envelope field spelling.
    pub format: WireFormat,
}

/// State shared by every handle and read by the connection task.
pub(crate) struct AddonInner {
    /// Build-time configuration.
    pub launch: LaunchConfig,
    /// Timeout for direct-message requests.
    pub dm_timeout: Duration,
    /// Published by the connection task.
    pub state: RwLock<ConnectionState>,
    /// Written by the event router only.
    pub registry: RwLock<ClientRegistry>,
    /// Set on successful registration, cleared on disconnect.
    pub addon_id: RwLock<Option<AddonId>>,
}

/// The command channel and task, owned by application handles only.
#[derive(Default)]
pub(crate) struct Control {
    /// Sender into the running connection task.
    command_tx: Mutex<Option<mpsc::UnboundedSender<ManagerCommand>>>,
    /// The running connection task.
    task: Mutex<Option<JoinHandle<()>>>,
}

/// How a handle reaches the [`Control`].
#[derive(Clone)]
enum ControlRef {
    /// Application handle; keeps the connection alive.
    Owned(Arc<Control>),
    /// Connection task and handler handle; lives only as long as an owner.
    Borrowed(Weak<Control>),
}

impl ControlRef {
    fn get(&self) -> Option<Arc<Control>> {
        match self {
            Self::Owned(control) => Some(Arc::clone(control)),
            Self::Borrowed(control) => control.upgrade(),
        }
    }

    fn downgrade(&self) -> Weak<Control> {
        match self {
            Self::Owned(control) => Arc::downgrade(control),
            Self::Borrowed(control) => control.clone(),
        }
    }
}

// ============================================================================
// Addon
// ============================================================================

/// Handle to a Word Bomb addon connection.
///
/// Cloning is cheap; all clones share one connection. The connection task
/// stops once every handle returned by [`AddonBuilder::build`] (and its
/// clones) is dropped. Handles passed to handlers do not keep it alive.
#[derive(Clone)]
pub struct Addon {
    pub(crate) inner: Arc<AddonInner>,
    control: ControlRef,
}

impl fmt::Debug for Addon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addon")
            .field("name", &self.inner.launch.registration.name)
            .field("state", &self.state())
            .field("client_count", &self.inner.registry.read().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Addon - Construction
// ============================================================================

impl Addon {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> AddonBuilder {
        AddonBuilder::new()
    }

    pub(crate) fn from_launch(launch: LaunchConfig, dm_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(AddonInner {
                launch,
                dm_timeout,
                state: RwLock::new(ConnectionState::Disconnected),
                registry: RwLock::new(ClientRegistry::new()),
                addon_id: RwLock::new(None),
            }),
            control: ControlRef::Owned(Arc::new(Control::default())),
        }
    }

    /// Returns a handle that shares state but does not own the connection.
    pub(crate) fn downgrade(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            control: ControlRef::Borrowed(self.control.downgrade()),
        }
    }
}

// ============================================================================
// Addon - Lifecycle
// ============================================================================

impl Addon {
    /// Starts connecting in the background.
    ///
    /// Idempotent while the connection task is running. Outcomes are
    /// reported through lifecycle handlers.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(&self) {
        let Some(control) = self.control.get() else {
            debug!("Addon already dropped, not starting");
            return;
        };

        let mut task = control.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Connection task already running");
            return;
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *control.command_tx.lock() = Some(command_tx);

        let connection = ConnectionTask::new(self.downgrade(), command_rx);
        *task = Some(tokio::spawn(connection.run()));

        debug!(name = %self.inner.launch.registration.name, "Connection task started");
    }

    /// Closes the connection and suppresses further reconnects.
    ///
    /// Waits for the connection task to finish. Outstanding direct-message
    /// requests fail with [`Error::ConnectionClosed`].
    pub async fn stop(&self) {
        let Some(control) = self.control.get() else {
            return;
        };
        let task = control.task.lock().take();
        let command_tx = control.command_tx.lock().take();
        drop(control);

        if let Some(command_tx) = command_tx {
            let _ = command_tx.send(ManagerCommand::Stop);
        }

        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Connection task ended abnormally");
        }

        debug!("Connection task stopped");
    }

    /// Returns `true` while the connection task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control.get().is_some_and(|control| {
            control
                .task
                .lock()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
        })
    }
}

// ============================================================================
// Addon - Read Surface
// ============================================================================

impl Addon {
    /// Current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Returns `true` when registered and accepting outbound traffic.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Identifier from the current registration.
    #[must_use]
    pub fn addon_id(&self) -> Option<AddonId> {
        self.inner.addon_id.read().clone()
    }

    /// All known clients, in the order the server announced them.
    #[must_use]
    pub fn clients(&self) -> Vec<ClientSession> {
        self.inner.registry.read().list()
    }

    /// Looks up one client.
    #[must_use]
    pub fn client(&self, id: &ClientId) -> Option<ClientSession> {
        self.inner.registry.read().get(id).cloned()
    }

    /// Command names announced at registration.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.inner.launch.registration.commands
    }
}

// ============================================================================
// Addon - Outbound
// ============================================================================

impl Addon {
    /// Sends an event to one client.
    ///
    /// Dropped silently unless the connection is Ready; nothing is queued
    /// across reconnects.
    pub fn send(&self, client: &ClientId, event: impl Into<String>, data: Value) {
        self.submit_when_ready(Command::Send(AddressedSend {
            to: client.clone(),
            event: event.into(),
            data,
        }));
    }

    /// Sends a chat line to one client.
    pub fn send_chat(&self, client: &ClientId, message: impl Into<String>) {
        self.send(client, "chat", chat_payload(message));
    }

    /// Sends an embed panel to one client.
    pub fn send_embed(&self, client: &ClientId, embed: &Embed) {
        match serde_json::to_value(embed) {
            Ok(data) => self.send(client, "embed", data),
            Err(e) => warn!(error = %e, "Failed to serialize embed"),
        }
    }

    /// Sends an event to every client.
    ///
    /// Dropped silently unless the connection is Ready.
    pub fn broadcast(&self, event: impl Into<String>, data: Value) {
        self.submit_when_ready(Command::Broadcast(Broadcast {
            event: event.into(),
            data,
        }));
    }

    /// Sends a chat line to every client.
    pub fn broadcast_chat(&self, message: impl Into<String>) {
        self.broadcast("chat", chat_payload(message));
    }

    /// Sends a direct message to a client through the server's chat bridge.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the connection is not Ready
    /// - [`Error::DirectMessage`] if the server reports a failure
    /// - [`Error::RequestTimeout`] if no result arrives in time
    /// - [`Error::ConnectionClosed`] if the connection drops first
    pub async fn send_discord_message(
        &self,
        client: &ClientId,
        message: impl Into<String>,
    ) -> Result<()> {
        self.request_direct_message(DirectMessage {
            to: client.clone(),
            body: DirectMessageBody::Text {
                message: message.into(),
            },
        })
        .await
    }

    /// Sends a file to a client through the server's chat bridge.
    ///
    /// # Errors
    ///
    /// Same as [`send_discord_message`](Self::send_discord_message).
    pub async fn send_discord_file(
        &self,
        client: &ClientId,
        file_name: impl Into<String>,
        file_content: impl Into<String>,
    ) -> Result<()> {
        self.request_direct_message(DirectMessage {
            to: client.clone(),
            body: DirectMessageBody::File {
                file_name: file_name.into(),
                file_content: file_content.into(),
            },
        })
        .await
    }

    /// Submits a direct message and waits for its correlated result.
    async fn request_direct_message(&self, message: DirectMessage) -> Result<()> {
        if !self.is_ready() {
            return Err(Error::NotConnected);
        }

        let request_id = RequestId::next();
        let (response_tx, response_rx) = oneshot::channel();

        if !self.submit(ManagerCommand::DirectMessage {
            request_id,
            message,
            response_tx,
        }) {
            return Err(Error::NotConnected);
        }

        match timeout(self.inner.dm_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                // Timeout - clean up correlation entry
                self.submit(ManagerCommand::RemoveCorrelation(request_id));

                Err(Error::request_timeout(
                    request_id,
                    self.inner.dm_timeout.as_millis() as u64,
                ))
            }
        }
    }

    fn submit_when_ready(&self, command: Command) {
        if !self.is_ready() {
            trace!(kind = command.kind(), state = %self.state(), "Not ready, dropping outbound message");
            return;
        }
        self.submit(ManagerCommand::Send(command));
    }

    /// Hands a command to the connection task. Returns `false` if none is running.
    fn submit(&self, command: ManagerCommand) -> bool {
        self.control.get().is_some_and(|control| {
            control
                .command_tx
                .lock()
                .as_ref()
                .is_some_and(|tx| tx.send(command).is_ok())
        })
    }
}
