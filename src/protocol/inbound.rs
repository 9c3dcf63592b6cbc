//! Inbound client frames
//!
//! Clients send one JSON object per WebSocket frame:
//!
//! ```text
//! { "type": string, "targetId": uint, "roomId": uint, "payload": any }
//! ```
//!
//! The `type` field selects the destination. Decoding into [`ClientCommand`]
//! is the single dispatch point for everything a client may send.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::message::Message;
use super::signal::{RoomSignalingMessage, SignalKind, SignalingMessage};
use super::{ActorId, RoomId};

/// Raw client frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub target_id: ActorId,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub room_id: RoomId,
    #[serde(default)]
    pub payload: Value,
}

// Clients send `null` for an absent id as often as they omit it
fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Decoded client intent
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Pairwise negotiation
    Signal(SignalingMessage),
    /// Pairwise negotiation inside a room
    RoomSignal(RoomSignalingMessage),
    /// Typing indicator, routed through the hub
    Typing(Message),
    /// Known type missing a required field
    Rejected {
        frame: InboundFrame,
        reason: &'static str,
    },
    /// Unknown type
    Unrecognized(InboundFrame),
}

impl InboundFrame {
    /// Decode a text frame
    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Decode a binary frame holding JSON
    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Turn the frame into a command on behalf of `sender`
    ///
    /// Plain negotiation types carrying a room id are treated as room-scoped.
    /// `room_*` types without a room id never reach the router.
    pub fn into_command(self, sender: ActorId) -> ClientCommand {
        if let Some(kind) = SignalKind::from_wire(&self.kind) {
            if self.room_id != 0 {
                return ClientCommand::RoomSignal(self.room_signal(kind, sender));
            }
            let mut msg = SignalingMessage::new(kind, self.target_id, self.payload);
            msg.sender_id = sender;
            return ClientCommand::Signal(msg);
        }

        if let Some(kind) = SignalKind::from_room_wire(&self.kind) {
            if self.room_id == 0 {
                return ClientCommand::Rejected {
                    frame: self,
                    reason: "room signaling without roomId",
                };
            }
            return ClientCommand::RoomSignal(self.room_signal(kind, sender));
        }

        if self.kind == "typing" {
            if self.target_id == 0 && self.room_id == 0 {
                return ClientCommand::Rejected {
                    frame: self,
                    reason: "typing without targetId or roomId",
                };
            }
            return ClientCommand::Typing(Message::typing(sender, self.target_id, self.room_id));
        }

        ClientCommand::Unrecognized(self)
    }

    fn room_signal(self, kind: SignalKind, sender: ActorId) -> RoomSignalingMessage {
        let mut msg = RoomSignalingMessage::new(kind, self.room_id, self.target_id, self.payload);
        msg.sender_id = sender;
        msg
    }
}
