//! Live device connection handle.
//!
//! A [`ConnectionHandle`] is the registry's view of one WebSocket: an id for
//! logs and indexing, a liveness flag flipped by the heartbeat, and the
//! sending half of the connection task's outbound queue. The socket itself is
//! owned by the task in [`crate::ws::connection`]; everything else talks to it
//! through this handle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::protocol::WireMessage;

/// Identifier of one accepted WebSocket connection.
///
/// Wraps a UUID v4 generated on upgrade. Only used for diagnostics and as
/// the key of the connection ↔ device-set index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruction queued for a connection task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Encode and send a wire message as a text frame.
    Message(WireMessage),
    /// Send a WebSocket ping frame.
    Ping,
    /// Drop the transport without a closing handshake.
    Terminate,
}

/// Error returned when the connection task has already gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnectionClosed(pub ConnectionId);

/// Cloneable handle to a live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    alive: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Creates a handle and the receiving end its connection task drains.
    ///
    /// The connection starts out alive.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            alive: Arc::new(AtomicBool::new(true)),
            outbound,
        };
        (handle, rx)
    }

    /// Returns the connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a wire message for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionClosed`] if the connection task has exited.
    pub fn send(&self, message: WireMessage) -> Result<(), ConnectionClosed> {
        self.push(Outbound::Message(message))
    }

    /// Queues a ping frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionClosed`] if the connection task has exited.
    pub fn ping(&self) -> Result<(), ConnectionClosed> {
        self.push(Outbound::Ping)
    }

    /// Asks the connection task to drop its transport. Idempotent; a handle
    /// whose task is already gone is left as is.
    pub fn terminate(&self) {
        let _ = self.push(Outbound::Terminate);
    }

    /// Records a pong (or any sign of life) from the peer.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clears the liveness flag, returning its previous value.
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    /// Returns the current liveness flag.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Returns `true` once the connection task has dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    fn push(&self, outbound: Outbound) -> Result<(), ConnectionClosed> {
        self.outbound
            .send(outbound)
            .map_err(|_| ConnectionClosed(self.id))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_handles_have_distinct_ids() {
        let (a, _rx_a) = ConnectionHandle::new();
        let (b, _rx_b) = ConnectionHandle::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn take_alive_clears_flag() {
        let (conn, _rx) = ConnectionHandle::new();
        assert!(conn.is_alive());
        assert!(conn.take_alive());
        assert!(!conn.is_alive());
        assert!(!conn.take_alive());
        conn.mark_alive();
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn ping_and_terminate_are_queued_in_order() {
        let (conn, mut rx) = ConnectionHandle::new();
        assert!(conn.ping().is_ok());
        conn.terminate();

        let Some(Outbound::Ping) = rx.recv().await else {
            panic!("expected ping first");
        };
        let Some(Outbound::Terminate) = rx.recv().await else {
            panic!("expected terminate second");
        };
    }

    #[test]
    fn send_after_receiver_dropped_fails() {
        let (conn, rx) = ConnectionHandle::new();
        drop(rx);
        assert!(conn.is_closed());
        assert_eq!(conn.ping(), Err(ConnectionClosed(conn.id())));
        // terminate on a closed handle is a silent no-op
        conn.terminate();
    }
}
