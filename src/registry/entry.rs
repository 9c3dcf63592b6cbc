//! Registry entries
//!
//! The registry owns the only sender of each connection's outbound queue.
//! Dropping an entry (replacement or unregister) closes the queue, which is
//! how the connection's writer learns that it should shut down.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::{ActorId, OutboundFrame};

/// Identifies one specific connection of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    /// Actor the connection belongs to
    pub actor_id: ActorId,
    /// Process-unique id of the physical connection
    pub session_id: u64,
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.actor_id, self.session_id)
    }
}

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued for the writer
    Delivered,
    /// Queue at capacity, frame dropped
    QueueFull,
    /// No connection registered for the actor
    Offline,
    /// Writer already gone, frame dropped
    Closed,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Sending side of a connection, as stored in the registry
#[derive(Debug)]
pub struct ConnectionHandle {
    key: ConnectionKey,
    tx: mpsc::Sender<OutboundFrame>,
    registered_at: Instant,
}

impl ConnectionHandle {
    /// Create a handle and the matching outbound queue receiver
    pub fn channel(
        key: ConnectionKey,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            key,
            tx,
            registered_at: Instant::now(),
        };
        (handle, rx)
    }

    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    pub fn actor_id(&self) -> ActorId {
        self.key.actor_id
    }

    pub fn session_id(&self) -> u64 {
        self.key.session_id
    }

    /// How long this connection has been registered
    pub fn age(&self) -> std::time::Duration {
        self.registered_at.elapsed()
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, frame: OutboundFrame) -> Delivery {
        match self.tx.try_send(frame) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::QueueFull,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame() -> OutboundFrame {
        OutboundFrame::encode(&json!({"type": "ping"})).unwrap()
    }

    #[test]
    fn test_try_send_full_and_closed() {
        let key = ConnectionKey {
            actor_id: 1,
            session_id: 1,
        };
        let (handle, mut rx) = ConnectionHandle::channel(key, 1);

        assert_eq!(handle.try_send(frame()), Delivery::Delivered);
        assert_eq!(handle.try_send(frame()), Delivery::QueueFull);

        assert!(rx.try_recv().is_ok());
        rx.close();
        assert_eq!(handle.try_send(frame()), Delivery::Closed);
    }

    #[test]
    fn test_key_display() {
        let key = ConnectionKey {
            actor_id: 7,
            session_id: 12,
        };
        assert_eq!(key.to_string(), "7#12");
    }
}
