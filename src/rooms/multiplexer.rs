//! Room multiplexer implementation
//!
//! Rooms hold identities, not sockets. Dispatch resolves recipients under the
//! room lock, releases it, and then delivers through the global registry so
//! liveness and queue state have a single owner.
//!
//! Presence events are the exception: their recipients are captured under
//! the write lock of the join or leave that raised them.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::RwLock;

use super::error::RoomError;
use super::event::{Audience, DomainEvent, EventKind};
use super::room::{Role, Room};
use crate::protocol::{ActorId, OutboundFrame, RoomId};
use crate::registry::ConnectionRegistry;

#[derive(Debug, Default)]
struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    /// Reverse index: the one room each actor belongs to
    memberships: HashMap<ActorId, RoomId>,
}

/// Cloneable handle to the room state and its dispatch task
#[derive(Clone)]
pub struct RoomMultiplexer {
    table: Arc<RwLock<RoomTable>>,
    tx: mpsc::Sender<DomainEvent>,
    registry: Arc<ConnectionRegistry>,
}

/// The task side of the multiplexer
pub struct RoomWorker {
    rx: mpsc::Receiver<DomainEvent>,
    table: Arc<RwLock<RoomTable>>,
    registry: Arc<ConnectionRegistry>,
}

impl RoomMultiplexer {
    /// Create a multiplexer handle and its worker
    pub fn new(registry: Arc<ConnectionRegistry>) -> (Self, RoomWorker) {
        let (tx, rx) = mpsc::channel(registry.config().room_channel_capacity.max(1));
        let table = Arc::new(RwLock::new(RoomTable::default()));

        let multiplexer = Self {
            table: Arc::clone(&table),
            tx,
            registry: Arc::clone(&registry),
        };
        (multiplexer, RoomWorker { rx, table, registry })
    }

    /// Add `actor` to `room_id` under `role`
    ///
    /// Creates the room if absent. Joining the same room with the same role
    /// again is a no-op. Membership is never migrated implicitly: switching
    /// role or room requires a [`leave`](Self::leave) first.
    pub async fn join(&self, room_id: RoomId, actor: ActorId, role: Role) -> Result<(), RoomError> {
        if room_id == 0 || actor == 0 {
            return Err(RoomError::InvalidId {
                room: room_id,
                actor,
            });
        }

        let mut created = false;
        let others = {
            let mut guard = self.table.write().await;
            let table = &mut *guard;

            if let Some(&current_room) = table.memberships.get(&actor) {
                if current_room != room_id {
                    return Err(RoomError::AlreadyInRoom {
                        actor,
                        current_room,
                    });
                }
                match table.rooms.get(&room_id).and_then(|room| room.role_of(actor)) {
                    Some(current) if current == role => return Ok(()),
                    Some(current) => {
                        return Err(RoomError::RoleConflict {
                            room: room_id,
                            actor,
                            current,
                        })
                    }
                    None => {}
                }
            }

            let room = table.rooms.entry(room_id).or_insert_with(|| {
                created = true;
                Room::new(room_id)
            });
            room.insert(actor, role);
            let others = staff_except(room, actor);
            table.memberships.insert(actor, room_id);
            others
        };

        tracing::info!(
            room = room_id,
            actor = actor,
            role = %role,
            created = created,
            "Member joined room"
        );

        if role.is_privileged() && !others.is_empty() {
            self.dispatch(
                DomainEvent::new(
                    EventKind::MemberJoined,
                    room_id,
                    json!({ "userId": actor, "role": role.to_string() }),
                )
                .to_members(others),
            );
        }

        Ok(())
    }

    /// Remove `actor` from `room_id`
    ///
    /// Deletes the room once both member sets are empty. Leaving a room the
    /// actor is not in is a no-op.
    pub async fn leave(&self, room_id: RoomId, actor: ActorId) {
        let removed = {
            let mut guard = self.table.write().await;
            let table = &mut *guard;

            let Some(room) = table.rooms.get_mut(&room_id) else {
                return;
            };
            let Some(role) = room.remove(actor) else {
                return;
            };
            table.memberships.remove(&actor);

            let emptied = room.is_empty();
            let remaining = staff_except(room, actor);
            if emptied {
                table.rooms.remove(&room_id);
            }
            (role, emptied, remaining)
        };

        let (role, emptied, remaining) = removed;
        tracing::info!(room = room_id, actor = actor, role = %role, "Member left room");
        if emptied {
            tracing::info!(room = room_id, "Removed empty room");
        }

        if role.is_privileged() && !remaining.is_empty() {
            self.dispatch(
                DomainEvent::new(
                    EventKind::MemberLeft,
                    room_id,
                    json!({ "userId": actor, "role": role.to_string() }),
                )
                .to_members(remaining),
            );
        }
    }

    /// Remove `actor` from whatever room it is in
    pub async fn evict(&self, actor: ActorId) {
        if let Some((room_id, _)) = self.room_of(actor).await {
            self.leave(room_id, actor).await;
        }
    }

    /// Queue an event for routing
    ///
    /// Never waits. A saturated channel drops the event.
    pub fn dispatch(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.registry.counters().record_overflow();
                tracing::warn!(
                    room = event.room_id,
                    kind = %event.kind,
                    "Room event channel full, event dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Room dispatcher stopped, event dropped");
            }
        }
    }

    /// Room and role of `actor`, if it is a member anywhere
    pub async fn room_of(&self, actor: ActorId) -> Option<(RoomId, Role)> {
        let table = self.table.read().await;
        let room_id = *table.memberships.get(&actor)?;
        let role = table.rooms.get(&room_id)?.role_of(actor)?;
        Some((room_id, role))
    }

    /// Staff members of a room
    pub async fn connected_staff(&self, room_id: RoomId) -> Vec<ActorId> {
        let table = self.table.read().await;
        table
            .rooms
            .get(&room_id)
            .map(|room| room.staff().collect())
            .unwrap_or_default()
    }

    /// Number of staff members in a room
    pub async fn online_staff_count(&self, room_id: RoomId) -> usize {
        let table = self.table.read().await;
        table.rooms.get(&room_id).map_or(0, Room::staff_count)
    }

    /// Every member of a room with its role
    pub async fn members(&self, room_id: RoomId) -> Vec<(ActorId, Role)> {
        let table = self.table.read().await;
        let Some(room) = table.rooms.get(&room_id) else {
            return Vec::new();
        };
        room.staff()
            .map(|actor| (actor, Role::Staff))
            .chain(room.guests().map(|actor| (actor, Role::Guest)))
            .collect()
    }

    /// Whether a room currently exists
    pub async fn room_exists(&self, room_id: RoomId) -> bool {
        self.table.read().await.rooms.contains_key(&room_id)
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.table.read().await.rooms.len()
    }
}

impl RoomWorker {
    /// Drain the event channel until every [`RoomMultiplexer`] handle is dropped
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.route(event).await;
        }

        tracing::debug!("Room dispatcher stopped");
    }

    /// Spawn the dispatcher on the current runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn route(&self, event: DomainEvent) {
        tracing::debug!(room = event.room_id, kind = %event.kind, "Processing room event");

        let recipients = if event.target_id != 0 {
            vec![event.target_id]
        } else if let Some(members) = &event.recipients {
            members.clone()
        } else {
            match self.resolve(&event).await {
                Some(recipients) => recipients,
                None => {
                    tracing::debug!(room = event.room_id, "No room for event");
                    return;
                }
            }
        };

        if recipients.is_empty() {
            return;
        }

        let frame = match OutboundFrame::encode(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, kind = %event.kind, "Failed to encode room event");
                return;
            }
        };

        let delivered = self.registry.deliver_many(&recipients, &frame).await;
        tracing::debug!(
            room = event.room_id,
            kind = %event.kind,
            recipients = recipients.len(),
            delivered = delivered,
            "Room event routed"
        );
    }

    /// Recipients inside the event's room, or `None` if the room is gone
    async fn resolve(&self, event: &DomainEvent) -> Option<Vec<ActorId>> {
        let table = self.table.read().await;
        let room = table.rooms.get(&event.room_id)?;

        Some(match event.kind.audience() {
            Audience::Staff => room.staff().collect(),
            Audience::Everyone => room.members().collect(),
        })
    }
}

fn staff_except(room: &Room, actor: ActorId) -> Vec<ActorId> {
    room.staff().filter(|member| *member != actor).collect()
}
