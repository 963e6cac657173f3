//! Connection task: lifecycle, handshake, reconnect and I/O loop.
//!
//! # Event Loop
//!
//! One tokio task per running addon owns the transport and drives:
//!
//! - Dialing through the [`Connector`](crate::transport::Connector)
//! - The registration handshake (`addon-register` → `addon-result`)
//! - Inbound frames, in arrival order, through the [`EventRouter`]
//! - Outbound commands from [`Addon`] handles
//! - Reconnect-with-backoff after every drop, until stopped or exhausted
//!
//! All table mutation happens here, between suspension points, so handlers
//! always observe registry updates from earlier frames.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::addon::{Addon, LifecycleEvent};
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{AddonResult, Command, DirectMessage, InboundMessage, WireFormat};
use crate::transport::{Incoming, Transport};

use super::backoff::Backoff;
use super::router::EventRouter;
use super::state::ConnectionState;

// ============================================================================
// Constants
// ============================================================================

/// Close reason reported when the peer gives none.
const DEFAULT_CLOSE_REASON: &str = "Connection closed";

/// Rejection reason reported when `addon-result` carries none.
const DEFAULT_REJECT_REASON: &str = "no reason given";

// ============================================================================
// ManagerCommand
// ============================================================================

/// Commands from [`Addon`] handles to the connection task.
pub(crate) enum ManagerCommand {
    /// Fire-and-forget outbound message.
    Send(Command),
    /// Direct message awaiting an `addon-dm-result`.
    DirectMessage {
        request_id: RequestId,
        message: DirectMessage,
        response_tx: oneshot::Sender<Result<()>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Close the transport and exit.
    Stop,
}

// ============================================================================
// SessionEnd
// ============================================================================

/// Why a connected session ended.
#[derive(Debug)]
enum SessionEnd {
    /// `stop()` was called or every owning handle was dropped.
    Stopped,
    /// Transport closed, failed, or could not be opened.
    Lost(String),
    /// Server declined the registration.
    Rejected(Error),
}

// ============================================================================
// ConnectionTask
// ============================================================================

/// State owned by the connection task.
pub(crate) struct ConnectionTask {
    addon: Addon,
    router: EventRouter,
    command_rx: mpsc::UnboundedReceiver<ManagerCommand>,
    backoff: Backoff,
    format: WireFormat,
}

impl ConnectionTask {
    /// Creates the task state for an addon.
    pub(crate) fn new(addon: Addon, command_rx: mpsc::UnboundedReceiver<ManagerCommand>) -> Self {
        let launch = &addon.inner.launch;
        let router = EventRouter::new(Arc::clone(&launch.handlers));
        let backoff = Backoff::new(launch.policy);
        let format = launch.format;

        Self {
            addon,
            router,
            command_rx,
            backoff,
            format,
        }
    }

    /// Runs until stopped or until reconnect attempts are exhausted.
    pub(crate) async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            let connector = Arc::clone(&self.addon.inner.launch.connector);

            let end = tokio::select! {
                connected = connector.connect() => match connected {
                    Ok(transport) => self.run_session(transport).await,
                    Err(e) => {
                        warn!(error = %e, "Connect attempt failed");
                        SessionEnd::Lost(e.to_string())
                    }
                },
                () = self.idle_until_stop() => SessionEnd::Stopped,
            };

            self.enter_disconnected();

            match end {
                SessionEnd::Stopped => break,
                SessionEnd::Lost(reason) => {
                    info!(%reason, "Addon offline");
                    self.emit(&LifecycleEvent::Offline { reason });
                }
                SessionEnd::Rejected(err) => {
                    error!(error = %err, "Registration rejected");
                    self.emit(&LifecycleEvent::from_error(&err));
                }
            }

            let Some(delay) = self.backoff.next_delay() else {
                let err = Error::reconnect_exhausted(self.backoff.attempts());
                error!(attempts = self.backoff.attempts(), "Giving up on reconnecting");
                self.emit(&LifecycleEvent::from_error(&err));
                break;
            };

            info!(
                attempt = self.backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Scheduling reconnect"
            );

            if !self.wait_backoff(delay).await {
                break;
            }
        }

        self.router.correlator().fail_all();
        debug!("Connection task terminated");
    }

    /// Drives one open transport: handshake, then the I/O loop.
    async fn run_session(&mut self, mut transport: Box<dyn Transport>) -> SessionEnd {
        self.set_state(ConnectionState::Handshaking);
        self.emit(&LifecycleEvent::Connected);

        let registration = Command::Register(self.addon.inner.launch.registration.clone());
        if let Err(e) = Self::write(transport.as_mut(), self.format, registration).await {
            warn!(error = %e, "Failed to send registration");
            return SessionEnd::Lost(e.to_string());
        }
        debug!("Registration sent, awaiting acknowledgement");

        loop {
            tokio::select! {
                incoming = transport.recv() => match incoming {
                    Ok(Incoming::Text(text)) => {
                        if let Some(end) = self.handle_frame(&text) {
                            let _ = transport.close().await;
                            return end;
                        }
                    }

                    Ok(Incoming::Closed { reason }) => {
                        return SessionEnd::Lost(
                            reason.unwrap_or_else(|| DEFAULT_CLOSE_REASON.to_string()),
                        );
                    }

                    Err(e) => {
                        error!(error = %e, "Transport error");
                        return SessionEnd::Lost(e.to_string());
                    }
                },

                command = self.command_rx.recv() => match command {
                    Some(ManagerCommand::Send(command)) => {
                        if !self.state().is_ready() {
                            trace!(kind = command.kind(), "Not ready, dropping outbound message");
                            continue;
                        }
                        if let Err(e) = Self::write(transport.as_mut(), self.format, command).await {
                            warn!(error = %e, "Failed to send message");
                        }
                    }

                    Some(ManagerCommand::DirectMessage { request_id, message, response_tx }) => {
                        if !self.state().is_ready() {
                            let _ = response_tx.send(Err(Error::NotConnected));
                            continue;
                        }

                        // Register before sending so a fast result finds it
                        self.router.correlator().insert(request_id, response_tx);

                        let command = Command::DirectMessage(message);
                        if let Err(e) = Self::write(transport.as_mut(), self.format, command).await {
                            warn!(error = %e, %request_id, "Failed to send direct message");
                            self.router.correlator().remove(request_id);
                        }
                    }

                    Some(ManagerCommand::RemoveCorrelation(request_id)) => {
                        self.router.correlator().remove(request_id);
                    }

                    Some(ManagerCommand::Stop) | None => {
                        debug!("Stop requested, closing transport");
                        let _ = transport.close().await;
                        return SessionEnd::Stopped;
                    }
                },
            }
        }
    }

    /// Decodes, classifies and routes one text frame.
    ///
    /// Returns `Some` when the frame ends the session.
    fn handle_frame(&mut self, text: &str) -> Option<SessionEnd> {
        let message = match self
            .format
            .decode(text)
            .and_then(InboundMessage::classify)
        {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, len = text.len(), "Dropping malformed frame");
                return None;
            }
        };

        match message {
            InboundMessage::AddonResult(result) => self.on_registration_result(result),
            other => {
                self.router.dispatch(&self.addon, other);
                None
            }
        }
    }

    /// Completes (or fails) the handshake.
    fn on_registration_result(&mut self, result: AddonResult) -> Option<SessionEnd> {
        if self.state() != ConnectionState::Handshaking {
            warn!(state = %self.state(), "Unexpected registration acknowledgement, ignoring");
            return None;
        }

        if !result.ok {
            let reason = result
                .err
                .unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string());
            return Some(SessionEnd::Rejected(Error::registration_rejected(reason)));
        }

        *self.addon.inner.addon_id.write() = result.id.clone();
        self.set_state(ConnectionState::Ready);
        self.backoff.reset();

        info!(addon_id = ?result.id, "Addon ready");
        self.emit(&LifecycleEvent::Ready {
            addon_id: result.id,
        });
        None
    }

    /// Drains commands while no transport is open, returning on stop.
    ///
    /// Outbound messages are dropped and direct messages fail immediately.
    async fn idle_until_stop(&mut self) {
        while let Some(command) = self.command_rx.recv().await {
            match command {
                ManagerCommand::Send(command) => {
                    trace!(kind = command.kind(), "Disconnected, dropping outbound message");
                }
                ManagerCommand::DirectMessage { response_tx, .. } => {
                    let _ = response_tx.send(Err(Error::NotConnected));
                }
                ManagerCommand::RemoveCorrelation(request_id) => {
                    self.router.correlator().remove(request_id);
                }
                ManagerCommand::Stop => return,
            }
        }
    }

    /// Sleeps out a backoff delay. Returns `false` if stopped meanwhile.
    async fn wait_backoff(&mut self, delay: Duration) -> bool {
        tokio::select! {
            () = sleep(delay) => true,
            () = self.idle_until_stop() => {
                debug!("Stop requested during backoff");
                false
            }
        }
    }

    /// Moves to Disconnected, clearing everything tied to the session.
    fn enter_disconnected(&mut self) {
        self.set_state(ConnectionState::Disconnected);
        self.addon.inner.registry.write().clear();
        *self.addon.inner.addon_id.write() = None;
        self.router.correlator().fail_all();
    }

    fn state(&self) -> ConnectionState {
        *self.addon.inner.state.read()
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.addon.inner.state.write();
        let previous = *state;
        if previous == next {
            return;
        }
        debug_assert!(
            previous.can_transition_to(next),
            "invalid transition {previous} -> {next}"
        );
        debug!(from = %previous, to = %next, "Connection state changed");
        *state = next;
    }

    fn emit(&self, event: &LifecycleEvent) {
        self.router.handlers().emit(&self.addon, event);
    }

    async fn write(transport: &mut dyn Transport, format: WireFormat, command: Command) -> Result<()> {
        let kind = command.kind();
        let text = format.encode(&command.into_envelope()?)?;
        transport.send(text).await?;
        trace!(kind, "Frame sent");
        Ok(())
    }
}
