//! Hub publish channel
//!
//! Application code publishes message envelopes through a [`Hub`] handle.
//! A single task drains the channel, serializes each message once and hands
//! it to the registry, so routing is serial while connection I/O stays
//! parallel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::store::ConnectionRegistry;
use crate::protocol::{ActorId, Message, OutboundFrame, RoomId};

/// Cloneable handle to the hub task
#[derive(Clone)]
pub struct Hub {
    tx: mpsc::Sender<Message>,
    registry: Arc<ConnectionRegistry>,
}

/// The task side of the hub
pub struct HubWorker {
    rx: mpsc::Receiver<Message>,
    registry: Arc<ConnectionRegistry>,
}

impl Hub {
    /// Create a hub handle and its worker
    pub fn new(registry: Arc<ConnectionRegistry>) -> (Self, HubWorker) {
        let (tx, rx) = mpsc::channel(registry.config().hub_channel_capacity.max(1));
        let hub = Self {
            tx,
            registry: Arc::clone(&registry),
        };
        (hub, HubWorker { rx, registry })
    }

    /// Registry this hub delivers through
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Queue a message for routing
    ///
    /// Never waits. If the hub is saturated the message is dropped and
    /// counted; the caller is not told.
    pub fn publish(&self, message: Message) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                self.registry.counters().record_overflow();
                tracing::warn!(
                    sender = message.sender_id,
                    kind = ?message.kind,
                    "Hub channel full, message dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Hub stopped, message dropped");
            }
        }
    }

    /// Publish a typing indicator towards a recipient or a room
    pub fn broadcast_typing(&self, sender: ActorId, recipient: ActorId, room_id: RoomId) {
        self.publish(Message::typing(sender, recipient, room_id));
    }
}

impl HubWorker {
    /// Drain the channel until every [`Hub`] handle is dropped
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            let frame = match OutboundFrame::encode(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode message");
                    continue;
                }
            };

            let delivered = self.registry.publish(&message, &frame).await;
            tracing::debug!(
                sender = message.sender_id,
                recipient = message.recipient_id,
                room = message.room_id,
                kind = ?message.kind,
                delivered = delivered,
                "Message routed"
            );
        }

        tracing::debug!("Hub worker stopped");
    }

    /// Spawn the worker on the current runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::registry::{ConnectionHandle, ConnectionKey, RegistryConfig};

    async fn connect(
        registry: &ConnectionRegistry,
        actor: ActorId,
    ) -> mpsc::Receiver<OutboundFrame> {
        let key = ConnectionKey {
            actor_id: actor,
            session_id: actor,
        };
        let (handle, rx) = ConnectionHandle::channel(key, 16);
        registry.register(handle).await;
        rx
    }

    #[tokio::test]
    async fn test_publish_through_worker() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (hub, worker) = Hub::new(Arc::clone(&registry));
        let task = worker.spawn();

        let mut a = connect(&registry, 1).await;
        let mut b = connect(&registry, 2).await;

        hub.publish(Message::direct(1, 2, json!({"text": "hi"})));

        let frame = b.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["senderId"], 1);
        assert_eq!(value["payload"]["text"], "hi");
        assert!(a.recv().await.is_some());

        drop(hub);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_typing_indicator() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (hub, worker) = Hub::new(Arc::clone(&registry));
        let _task = worker.spawn();

        let mut b = connect(&registry, 2).await;
        hub.broadcast_typing(1, 2, 0);

        let frame = b.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "typing");
        assert_eq!(value["senderId"], 1);
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let config = RegistryConfig::default().hub_channel_capacity(1);
        let registry = Arc::new(ConnectionRegistry::with_config(config));
        // Worker not running: the channel fills after one message
        let (hub, _worker) = Hub::new(Arc::clone(&registry));

        hub.publish(Message::direct(1, 2, Value::Null));
        hub.publish(Message::direct(1, 2, Value::Null));

        assert_eq!(registry.stats().channel_overflow, 1);
    }
}
