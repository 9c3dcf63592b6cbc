//! Direct and room message envelopes
//!
//! A [`Message`] is addressed by at most one of: an explicit target list,
//! a recipient, or a room. Direct messages are echoed to the sender so
//! every device of that actor observes its own action.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_unset, ActorId, RoomId};

/// Kind of envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Chat message
    Message,
    /// Typing indicator
    Typing,
}

/// Direct/room message envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub sender_id: ActorId,
    #[serde(skip_serializing_if = "is_unset")]
    pub recipient_id: ActorId,
    #[serde(skip_serializing_if = "is_unset")]
    pub room_id: RoomId,
    /// Explicit recipients, overriding recipient and room routing
    #[serde(skip)]
    pub targets: Vec<ActorId>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// Where a message should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Only these actors
    Targets(Vec<ActorId>),
    /// The recipient and the sender
    Direct { sender: ActorId, recipient: ActorId },
    /// Every registered connection; room filtering is left to clients
    Everyone,
    /// Neither recipient nor room set
    Invalid,
}

impl Message {
    /// Message from `sender` to `recipient`
    pub fn direct(sender: ActorId, recipient: ActorId, payload: Value) -> Self {
        Self {
            kind: MessageKind::Message,
            sender_id: sender,
            recipient_id: recipient,
            room_id: 0,
            targets: Vec::new(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Message from `sender` to a room
    pub fn room(sender: ActorId, room_id: RoomId, payload: Value) -> Self {
        Self {
            kind: MessageKind::Message,
            sender_id: sender,
            recipient_id: 0,
            room_id,
            targets: Vec::new(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Typing indicator from `sender` towards a recipient or a room
    pub fn typing(sender: ActorId, recipient: ActorId, room_id: RoomId) -> Self {
        Self {
            kind: MessageKind::Typing,
            sender_id: sender,
            recipient_id: recipient,
            room_id,
            targets: Vec::new(),
            payload: Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Restrict delivery to an explicit set of actors
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = ActorId>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Resolve the routing rule for this envelope
    pub fn route(&self) -> Route {
        let targets = unique_targets(&self.targets);
        if !targets.is_empty() {
            return Route::Targets(targets);
        }

        if self.recipient_id != 0 {
            Route::Direct {
                sender: self.sender_id,
                recipient: self.recipient_id,
            }
        } else if self.room_id != 0 {
            Route::Everyone
        } else {
            Route::Invalid
        }
    }
}

/// Deduplicate actor ids preserving order, skipping zeros
pub fn unique_targets(input: &[ActorId]) -> Vec<ActorId> {
    let mut seen = HashSet::with_capacity(input.len());
    input
        .iter()
        .copied()
        .filter(|id| *id != 0 && seen.insert(*id))
        .collect()
}
