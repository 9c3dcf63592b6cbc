//! Signaling router
//!
//! Relays negotiation messages to exactly one target through the registry's
//! direct-delivery path. The payload is opaque: offer/answer/candidate
//! validity is the business of the two endpoints.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::{ActorId, OutboundFrame, RoomSignalingMessage, SignalingMessage};
use crate::registry::{ConnectionRegistry, Delivery};

/// A stamped relay request
#[derive(Debug, Clone)]
pub enum Relay {
    Direct(SignalingMessage),
    Room(RoomSignalingMessage),
}

impl Relay {
    fn target(&self) -> ActorId {
        match self {
            Relay::Direct(msg) => msg.target_id,
            Relay::Room(msg) => msg.target_id,
        }
    }

    fn sender(&self) -> ActorId {
        match self {
            Relay::Direct(msg) => msg.sender_id,
            Relay::Room(msg) => msg.sender_id,
        }
    }

    fn encode(&self) -> serde_json::Result<OutboundFrame> {
        match self {
            Relay::Direct(msg) => OutboundFrame::encode(msg),
            Relay::Room(msg) => OutboundFrame::encode(msg),
        }
    }
}

/// Cloneable handle to the signaling task
#[derive(Clone)]
pub struct SignalingRouter {
    tx: mpsc::Sender<Relay>,
    registry: Arc<ConnectionRegistry>,
}

/// The task side of the router
pub struct SignalingWorker {
    rx: mpsc::Receiver<Relay>,
    registry: Arc<ConnectionRegistry>,
}

impl SignalingRouter {
    /// Create a router handle and its worker
    pub fn new(registry: Arc<ConnectionRegistry>) -> (Self, SignalingWorker) {
        let (tx, rx) = mpsc::channel(registry.config().signal_channel_capacity.max(1));
        let router = Self {
            tx,
            registry: Arc::clone(&registry),
        };
        (router, SignalingWorker { rx, registry })
    }

    /// Relay a direct message on behalf of `sender`
    ///
    /// Whatever sender the message carries is overwritten.
    pub fn relay(&self, sender: ActorId, mut message: SignalingMessage) {
        message.sender_id = sender;
        message.timestamp = Utc::now();
        self.enqueue(Relay::Direct(message));
    }

    /// Relay a room-scoped message on behalf of `sender`
    pub fn relay_in_room(&self, sender: ActorId, mut message: RoomSignalingMessage) {
        message.sender_id = sender;
        message.timestamp = Utc::now();
        self.enqueue(Relay::Room(message));
    }

    fn enqueue(&self, relay: Relay) {
        if relay.target() == 0 {
            tracing::debug!(sender = relay.sender(), "Signaling without target ignored");
            return;
        }

        match self.tx.try_send(relay) {
            Ok(()) => {}
            Err(TrySendError::Full(relay)) => {
                self.registry.counters().record_overflow();
                tracing::warn!(
                    sender = relay.sender(),
                    target = relay.target(),
                    "Signaling channel full, message dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Signaling router stopped, message dropped");
            }
        }
    }
}

impl SignalingWorker {
    /// Drain the channel until every [`SignalingRouter`] handle is dropped
    pub async fn run(mut self) {
        while let Some(relay) = self.rx.recv().await {
            self.forward(relay).await;
        }

        tracing::debug!("Signaling worker stopped");
    }

    /// Spawn the worker on the current runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn forward(&self, relay: Relay) {
        let frame = match relay.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode signaling message");
                return;
            }
        };

        let target = relay.target();
        let outcome = self.registry.deliver(target, &frame).await;

        match (&relay, outcome) {
            (Relay::Direct(msg), Delivery::Delivered) => tracing::debug!(
                kind = %msg.kind,
                sender = msg.sender_id,
                target = target,
                "Signaling forwarded"
            ),
            (Relay::Room(msg), Delivery::Delivered) => tracing::debug!(
                kind = msg.kind.room_str(),
                sender = msg.sender_id,
                target = target,
                room = msg.room_id,
                "Room signaling forwarded"
            ),
            (_, outcome) => tracing::debug!(
                sender = relay.sender(),
                target = target,
                outcome = ?outcome,
                "Signaling not delivered"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::protocol::SignalKind;
    use crate::registry::{ConnectionHandle, ConnectionKey};

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

    fn setup() -> (Arc<ConnectionRegistry>, SignalingRouter) {
        let registry = Arc::new(ConnectionRegistry::new());
        let (router, worker) = SignalingRouter::new(Arc::clone(&registry));
        worker.spawn();
        (registry, router)
    }

    #[tokio::test]
    async fn test_offer_reaches_only_target() {
        let (registry, router) = setup();
        let mut sender = connect(&registry, 3).await;
        let mut target = connect(&registry, 5).await;
        let mut other = connect(&registry, 6).await;

        let mut msg = SignalingMessage::new(SignalKind::Offer, 5, json!("sdp1"));
        msg.sender_id = 99;
        router.relay(3, msg);

        let frame = target.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "offer");
        assert_eq!(value["senderId"], 3);
        assert_eq!(value["payload"], "sdp1");

        // Signaling is processed in order, so a later relay proves nothing else arrived
        router.relay(3, SignalingMessage::new(SignalKind::Hangup, 5, Value::Null));
        assert!(target.recv().await.is_some());
        assert!(sender.try_recv().is_err());
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_relay() {
        let (registry, router) = setup();
        let mut target = connect(&registry, 8).await;

        router.relay_in_room(
            2,
            RoomSignalingMessage::new(SignalKind::Candidate, 42, 8, json!({"candidate": "c"})),
        );

        let frame = target.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "room_candidate");
        assert_eq!(value["roomId"], 42);
        assert_eq!(value["senderId"], 2);
    }

    #[tokio::test]
    async fn test_zero_target_is_noop() {
        let (registry, router) = setup();
        let mut a = connect(&registry, 1).await;

        router.relay(2, SignalingMessage::new(SignalKind::Offer, 0, Value::Null));
        router.relay_in_room(2, RoomSignalingMessage::new(SignalKind::Offer, 42, 0, Value::Null));
        router.relay(2, SignalingMessage::new(SignalKind::Answer, 1, Value::Null));

        let frame = a.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "answer");
        assert_eq!(registry.stats().delivered, 1);
    }

    #[tokio::test]
    async fn test_offline_target_is_counted() {
        let (registry, router) = setup();
        let mut a = connect(&registry, 1).await;

        router.relay(2, SignalingMessage::new(SignalKind::Offer, 77, Value::Null));
        router.relay(2, SignalingMessage::new(SignalKind::Offer, 1, Value::Null));

        assert!(a.recv().await.is_some());
        assert_eq!(registry.stats().dropped_offline, 1);
    }
}
