//! Peer-to-peer negotiation messages
//!
//! Signaling is strictly pairwise: every message names one target. The
//! sender id is never taken from the client; the router stamps it from the
//! connection the frame arrived on.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{ActorId, RoomId};

/// Negotiation message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
    Hangup,
}

impl SignalKind {
    /// Parse a direct wire name (`offer`, `answer`, ...)
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "offer" => Some(SignalKind::Offer),
            "answer" => Some(SignalKind::Answer),
            "candidate" => Some(SignalKind::Candidate),
            "hangup" => Some(SignalKind::Hangup),
            _ => None,
        }
    }

    /// Parse a room-scoped wire name (`room_offer`, `room_answer`, ...)
    pub fn from_room_wire(name: &str) -> Option<Self> {
        name.strip_prefix("room_").and_then(Self::from_wire)
    }

    /// Direct wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
            SignalKind::Hangup => "hangup",
        }
    }

    /// Room-scoped wire name
    pub fn room_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "room_offer",
            SignalKind::Answer => "room_answer",
            SignalKind::Candidate => "room_candidate",
            SignalKind::Hangup => "room_hangup",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_room_kind<S: Serializer>(kind: &SignalKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.room_str())
}

/// Direct signaling message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingMessage {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    /// Filled in by the router
    pub sender_id: ActorId,
    pub target_id: ActorId,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl SignalingMessage {
    /// Create an unstamped message towards `target_id`
    pub fn new(kind: SignalKind, target_id: ActorId, payload: Value) -> Self {
        Self {
            kind,
            sender_id: 0,
            target_id,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Signaling message scoped to a room
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSignalingMessage {
    #[serde(rename = "type", serialize_with = "serialize_room_kind")]
    pub kind: SignalKind,
    pub sender_id: ActorId,
    pub target_id: ActorId,
    pub room_id: RoomId,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl RoomSignalingMessage {
    /// Create an unstamped room message towards `target_id`
    pub fn new(kind: SignalKind, room_id: RoomId, target_id: ActorId, payload: Value) -> Self {
        Self {
            kind,
            sender_id: 0,
            target_id,
            room_id,
            payload,
            timestamp: Utc::now(),
        }
    }
}
