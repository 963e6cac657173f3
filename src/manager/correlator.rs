//! Direct-message request/response correlation.
//!
//! `addon-dm-result` frames carry no request identifier, so outstanding
//! requests are keyed by a locally issued, monotonically increasing
//! [`RequestId`] and a result always settles the oldest one. Concurrent
//! requests therefore queue up instead of overwriting each other.
//!
//! Timeouts are armed by the caller (see
//! [`Addon::send_discord_message`](crate::Addon::send_discord_message)),
//! which removes its own entry through [`Correlator::remove`].
//!
//! A result that arrives after its request timed out cannot be told apart
//! from a fresh one: it settles whichever request is oldest at that moment,
//! and that request's own result then settles the one after it. The
//! mismatch lasts until the queue drains.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::DirectMessageResult;

// ============================================================================
// Constants
// ============================================================================

/// Failure detail used when the server omits `err`.
const DEFAULT_FAILURE_DETAIL: &str = "Failed";

// ============================================================================
// Types
// ============================================================================

/// Completion channel of one outstanding request.
pub(crate) type Completion = oneshot::Sender<Result<()>>;

// ============================================================================
// Correlator
// ============================================================================

/// Outstanding direct-message requests, oldest first.
#[derive(Debug, Default)]
pub(crate) struct Correlator {
    pending: BTreeMap<RequestId, Completion>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers an outstanding request.
    pub(crate) fn insert(&mut self, id: RequestId, completion: Completion) {
        self.pending.insert(id, completion);
        trace!(%id, pending = self.pending.len(), "Direct message pending");
    }

    /// Settles the oldest outstanding request with the server's verdict.
    ///
    /// Returns the settled request ID, or `None` if nothing was pending
    /// (the result arrived after its request already timed out).
    pub(crate) fn resolve(&mut self, result: DirectMessageResult) -> Option<RequestId> {
        let Some((id, completion)) = self.pending.pop_first() else {
            debug!("Direct message result with no pending request, discarding");
            return None;
        };

        let outcome = if result.ok {
            Ok(())
        } else {
            Err(Error::direct_message(
                result
                    .err
                    .unwrap_or_else(|| DEFAULT_FAILURE_DETAIL.to_string()),
            ))
        };

        if completion.send(outcome).is_err() {
            trace!(%id, "Direct message caller already gone");
        }
        Some(id)
    }

    /// Drops a request whose caller gave up. Unknown IDs are ignored.
    pub(crate) fn remove(&mut self, id: RequestId) -> bool {
        let removed = self.pending.remove(&id).is_some();
        if removed {
            debug!(%id, "Removed timed-out direct message");
        }
        removed
    }

    /// Fails every outstanding request with [`Error::ConnectionClosed`].
    pub(crate) fn fail_all(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();

        for (_, completion) in pending {
            let _ = completion.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending direct messages on disconnect");
        }
        count
    }

    /// Number of outstanding requests.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
