//! WebSocket backend for the transport traits.
//!
//! # Connection Flow
//!
//! 1. [`WebSocketConnector::connect`] dials the server URL (with timeout)
//! 2. The stream is wrapped in a [`WebSocketTransport`]
//! 3. Text frames are surfaced as [`Incoming::Text`], close frames as
//!    [`Incoming::Closed`]; ping/pong and binary frames are skipped

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

use super::channel::{Connector, Incoming, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the TCP + TLS + upgrade handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Dials a WebSocket server URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    /// Server URL (`ws://` or `wss://`).
    url: Url,
    /// Handshake timeout.
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Creates a connector for the given URL.
    #[inline]
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Overrides the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Returns the server URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let (stream, response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "handshake with {} timed out after {}ms",
                    self.url,
                    self.connect_timeout.as_millis()
                ))
            })??;

        debug!(url = %self.url, status = %response.status(), "WebSocket connected");

        Ok(Box::new(WebSocketTransport { stream }))
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// An open WebSocket connection.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Incoming> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Incoming::Text(text.as_str().to_owned()));
                }

                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|r| !r.is_empty());
                    debug!(?reason, "WebSocket closed by remote");
                    return Ok(Incoming::Closed { reason });
                }

                Some(Err(e)) => return Err(e.into()),

                None => return Ok(Incoming::Closed { reason: None }),

                // Ignore Binary, Ping, Pong, Frame
                Some(Ok(other)) => {
                    trace!(len = other.len(), "Skipping non-text frame");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
