//! Router container
//!
//! [`Switchboard`] owns the registry and one handle to each router. It is
//! built once, cloned into every component that publishes or connects, and
//! replaces any notion of process-global hub state.

use std::sync::Arc;

use crate::registry::{ConnectionRegistry, Hub, RegistryConfig};
use crate::rooms::RoomMultiplexer;
use crate::signaling::SignalingRouter;
use crate::stats::DeliveryStats;

/// Cloneable handle to the registry and the three routers
#[derive(Clone)]
pub struct Switchboard {
    registry: Arc<ConnectionRegistry>,
    hub: Hub,
    signaling: SignalingRouter,
    rooms: RoomMultiplexer,
}

impl Switchboard {
    /// Build the routers and spawn their tasks on the current runtime
    ///
    /// Each task stops once every clone of this container is dropped.
    pub fn spawn(config: RegistryConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::with_config(config));

        let (hub, hub_worker) = Hub::new(Arc::clone(&registry));
        let (signaling, signaling_worker) = SignalingRouter::new(Arc::clone(&registry));
        let (rooms, room_worker) = RoomMultiplexer::new(Arc::clone(&registry));

        hub_worker.spawn();
        signaling_worker.spawn();
        room_worker.spawn();

        tracing::debug!("Switchboard routers started");

        Self {
            registry,
            hub,
            signaling,
            rooms,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn signaling(&self) -> &SignalingRouter {
        &self.signaling
    }

    pub fn rooms(&self) -> &RoomMultiplexer {
        &self.rooms
    }

    /// Delivery counters across all routers
    pub fn stats(&self) -> DeliveryStats {
        self.registry.stats()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::protocol::{Message, SignalKind, SignalingMessage};
    use crate::registry::{ConnectionHandle, ConnectionKey};
    use crate::rooms::Role;

    #[tokio::test]
    async fn test_all_routers_share_one_registry() {
        let board = Switchboard::spawn(RegistryConfig::default());

        let (handle, mut rx) = ConnectionHandle::channel(
            ConnectionKey {
                actor_id: 5,
                session_id: 1,
            },
            16,
        );
        board.registry().register(handle).await;
        board.rooms().join(1, 5, Role::Staff).await.unwrap();

        board
            .signaling()
            .relay(3, SignalingMessage::new(SignalKind::Offer, 5, json!("sdp1")));
        let frame = rx.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "offer");
        assert_eq!(value["senderId"], 3);

        board.hub().publish(Message::direct(3, 5, json!("hi")));
        let frame = rx.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "message");

        board.rooms().notify_waiter_call(1, json!({ "table": 4 }));
        let frame = rx.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "waiter_call");

        assert_eq!(board.stats().delivered, 3);
    }

    #[tokio::test]
    async fn test_zero_capacities_still_route() {
        let mut config = RegistryConfig::default();
        config.outbound_queue_capacity = 0;
        config.hub_channel_capacity = 0;
        config.signal_channel_capacity = 0;
        config.room_channel_capacity = 0;
        let board = Switchboard::spawn(config);

        let (handle, mut rx) = ConnectionHandle::channel(
            ConnectionKey {
                actor_id: 5,
                session_id: 1,
            },
            board.registry().config().outbound_queue_capacity,
        );
        board.registry().register(handle).await;
        board.rooms().join(1, 5, Role::Staff).await.unwrap();

        board
            .signaling()
            .relay(3, SignalingMessage::new(SignalKind::Answer, 5, json!("sdp2")));
        let frame = rx.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "answer");

        board.hub().publish(Message::direct(3, 5, json!("hi")));
        let frame = rx.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "message");

        board.rooms().notify_waiter_call(1, json!({ "table": 2 }));
        let frame = rx.recv().await.unwrap();
        let value: Value = serde_json::from_slice(frame.as_bytes()).unwrap();
        assert_eq!(value["type"], "waiter_call");
    }
}
