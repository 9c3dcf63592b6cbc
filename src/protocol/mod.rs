//! Wire protocol
//!
//! This module defines everything that crosses the WebSocket:
//! - Inbound client frames and the commands they decode into
//! - Signaling messages (offer/answer/candidate/hangup), direct and room-scoped
//! - Direct/room message envelopes
//! - Serialized outbound frames shared between recipients
//!
//! All JSON uses camelCase keys. Identifiers are unsigned integers where `0`
//! means "unset".

pub mod frame;
pub mod inbound;
pub mod message;
pub mod signal;

/// Identity of a connected actor (user, staff member, customer session)
pub type ActorId = u64;

/// Identity of a room
pub type RoomId = u64;

pub use frame::OutboundFrame;
pub use inbound::{ClientCommand, InboundFrame};
pub use message::{Message, MessageKind, Route};
pub use signal::{RoomSignalingMessage, SignalKind, SignalingMessage};

pub(crate) fn is_unset(id: &u64) -> bool {
    *id == 0
}
