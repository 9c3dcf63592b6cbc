//! Connection registry implementation
//!
//! The process-wide map from actor identity to the outbound queue of that
//! actor's live connection. Every router delivers through here, so the
//! registry is the single source of truth for liveness.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::entry::{ConnectionHandle, ConnectionKey, Delivery};
use crate::protocol::{ActorId, Message, OutboundFrame, Route};
use crate::stats::{DeliveryCounters, DeliveryStats};

/// Registry of live connections, one per actor
///
/// The lock is held only for map operations and non-blocking `try_send`
/// calls, never across I/O.
pub struct ConnectionRegistry {
    /// Map of actor id to the sending half of its connection
    connections: RwLock<HashMap<ActorId, ConnectionHandle>>,

    /// Delivery outcome counters
    counters: Arc<DeliveryCounters>,

    /// Configuration
    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            counters: Arc::new(DeliveryCounters::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Shared delivery counters
    pub fn counters(&self) -> &Arc<DeliveryCounters> {
        &self.counters
    }

    /// Snapshot of the delivery counters
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Register a connection
    ///
    /// Replaces any connection already registered for the same actor; the
    /// replaced queue is closed as its handle is dropped. Returns the session
    /// id of the replaced connection.
    pub async fn register(&self, handle: ConnectionHandle) -> Option<u64> {
        let key = handle.key();
        let replaced = self
            .connections
            .write()
            .await
            .insert(key.actor_id, handle)
            .map(|old| old.session_id());

        match replaced {
            Some(old_session) => tracing::info!(
                actor = key.actor_id,
                session_id = key.session_id,
                replaced_session = old_session,
                "Connection registered (replaced previous)"
            ),
            None => tracing::info!(
                actor = key.actor_id,
                session_id = key.session_id,
                "Connection registered"
            ),
        }

        replaced
    }

    /// Unregister a connection
    ///
    /// Only removes the entry if it still belongs to `key.session_id`, so a
    /// late unregister from a superseded connection cannot evict its
    /// replacement. Returns whether an entry was removed.
    pub async fn unregister(&self, key: ConnectionKey) -> bool {
        let mut connections = self.connections.write().await;

        match connections.get(&key.actor_id) {
            Some(current) if current.session_id() == key.session_id => {
                // Dropping the handle closes the outbound queue
                connections.remove(&key.actor_id);
                tracing::info!(
                    actor = key.actor_id,
                    session_id = key.session_id,
                    "Connection unregistered"
                );
                true
            }
            Some(current) => {
                tracing::debug!(
                    actor = key.actor_id,
                    session_id = key.session_id,
                    current_session = current.session_id(),
                    "Stale unregister ignored"
                );
                false
            }
            None => false,
        }
    }

    /// Deliver a frame to one actor without waiting
    pub async fn deliver(&self, actor: ActorId, frame: &OutboundFrame) -> Delivery {
        let connections = self.connections.read().await;
        self.deliver_locked(&connections, actor, frame)
    }

    /// Deliver a frame to several actors under a single lock acquisition
    ///
    /// Returns the number of successful deliveries.
    pub async fn deliver_many(&self, actors: &[ActorId], frame: &OutboundFrame) -> usize {
        let connections = self.connections.read().await;
        actors
            .iter()
            .filter(|actor| {
                self.deliver_locked(&connections, **actor, frame)
                    .is_delivered()
            })
            .count()
    }

    /// Deliver a frame to every connection whose actor matches `predicate`
    pub async fn broadcast<F>(&self, predicate: F, frame: &OutboundFrame) -> usize
    where
        F: Fn(ActorId) -> bool,
    {
        let connections = self.connections.read().await;
        let mut delivered = 0;

        for (actor, handle) in connections.iter() {
            if !predicate(*actor) {
                continue;
            }
            let outcome = handle.try_send(frame.clone());
            self.note(*actor, outcome);
            if outcome.is_delivered() {
                delivered += 1;
            }
        }

        delivered
    }

    /// Route a message envelope
    ///
    /// `frame` is the serialized form of `message`. Messages with neither a
    /// recipient nor a room are dropped.
    pub async fn publish(&self, message: &Message, frame: &OutboundFrame) -> usize {
        match message.route() {
            Route::Targets(targets) => self.deliver_many(&targets, frame).await,
            Route::Direct { sender, recipient } => {
                if sender == recipient || sender == 0 {
                    self.deliver_many(&[recipient], frame).await
                } else {
                    self.deliver_many(&[recipient, sender], frame).await
                }
            }
            Route::Everyone => self.broadcast(|_| true, frame).await,
            Route::Invalid => {
                self.counters.record_invalid();
                tracing::debug!(
                    sender = message.sender_id,
                    kind = ?message.kind,
                    "Message without recipient or room dropped"
                );
                0
            }
        }
    }

    /// Check whether an actor has a live connection
    pub async fn is_online(&self, actor: ActorId) -> bool {
        self.connections.read().await.contains_key(&actor)
    }

    /// Session id of the actor's live connection
    pub async fn session_of(&self, actor: ActorId) -> Option<u64> {
        self.connections
            .read()
            .await
            .get(&actor)
            .map(ConnectionHandle::session_id)
    }

    /// Actors with a live connection, in no particular order
    pub async fn connected_actors(&self) -> Vec<ActorId> {
        self.connections.read().await.keys().copied().collect()
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    fn deliver_locked(
        &self,
        connections: &HashMap<ActorId, ConnectionHandle>,
        actor: ActorId,
        frame: &OutboundFrame,
    ) -> Delivery {
        let outcome = match connections.get(&actor) {
            Some(handle) => handle.try_send(frame.clone()),
            None => Delivery::Offline,
        };
        self.note(actor, outcome);
        outcome
    }

    fn note(&self, actor: ActorId, outcome: Delivery) {
        self.counters.record(outcome);
        match outcome {
            Delivery::Delivered => {}
            Delivery::QueueFull => {
                tracing::trace!(actor = actor, "Outbound queue full, frame dropped")
            }
            Delivery::Offline => tracing::trace!(actor = actor, "Actor not connected"),
            Delivery::Closed => tracing::trace!(actor = actor, "Outbound queue closed"),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
