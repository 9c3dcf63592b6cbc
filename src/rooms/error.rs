//! Room membership errors

use super::room::Role;
use crate::protocol::{ActorId, RoomId};

/// Error type for room membership operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Room or actor id was zero
    #[error("Invalid id: room={room}, actor={actor}")]
    InvalidId { room: RoomId, actor: ActorId },

    /// Actor is already in this room under another role
    #[error("Actor {actor} already in room {room} as {current}")]
    RoleConflict {
        room: RoomId,
        actor: ActorId,
        current: Role,
    },

    /// Actor is already a member of a different room
    #[error("Actor {actor} already in room {current_room}")]
    AlreadyInRoom { actor: ActorId, current_room: RoomId },
}
