//! Domain events routed through rooms
//!
//! Each event kind declares its audience. Operational events (orders,
//! waiter calls, presence) reach staff only; catalogue updates reach every
//! member. Kinds this crate does not know default to staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::protocol::{is_unset, ActorId, RoomId};

/// Who inside a room receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Privileged members only
    Staff,
    /// Every member regardless of role
    Everyone,
}

/// Domain event category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewOrder,
    OrderStatusUpdate,
    OrderCancelled,
    WaiterCall,
    WaiterAcknowledged,
    WaiterCompleted,
    TableUpdate,
    MenuUpdate,
    StopListUpdate,
    MemberJoined,
    MemberLeft,
    /// Application-defined kind, routed to staff
    Custom(String),
}

impl EventKind {
    /// Parse a wire name; unknown names become [`EventKind::Custom`]
    pub fn from_wire(name: &str) -> Self {
        match name {
            "new_order" => EventKind::NewOrder,
            "order_status_update" => EventKind::OrderStatusUpdate,
            "order_cancelled" => EventKind::OrderCancelled,
            "waiter_call" => EventKind::WaiterCall,
            "waiter_acknowledged" => EventKind::WaiterAcknowledged,
            "waiter_completed" => EventKind::WaiterCompleted,
            "table_update" => EventKind::TableUpdate,
            "menu_update" => EventKind::MenuUpdate,
            "stop_list_update" => EventKind::StopListUpdate,
            "member_joined" => EventKind::MemberJoined,
            "member_left" => EventKind::MemberLeft,
            other => EventKind::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::NewOrder => "new_order",
            EventKind::OrderStatusUpdate => "order_status_update",
            EventKind::OrderCancelled => "order_cancelled",
            EventKind::WaiterCall => "waiter_call",
            EventKind::WaiterAcknowledged => "waiter_acknowledged",
            EventKind::WaiterCompleted => "waiter_completed",
            EventKind::TableUpdate => "table_update",
            EventKind::MenuUpdate => "menu_update",
            EventKind::StopListUpdate => "stop_list_update",
            EventKind::MemberJoined => "member_joined",
            EventKind::MemberLeft => "member_left",
            EventKind::Custom(name) => name,
        }
    }

    /// Which members of the room receive this kind
    pub fn audience(&self) -> Audience {
        match self {
            EventKind::MenuUpdate | EventKind::StopListUpdate => Audience::Everyone,
            // Customers hear about their own orders through a direct target
            EventKind::NewOrder
            | EventKind::OrderStatusUpdate
            | EventKind::OrderCancelled
            | EventKind::WaiterCall
            | EventKind::WaiterAcknowledged
            | EventKind::WaiterCompleted
            | EventKind::TableUpdate
            | EventKind::MemberJoined
            | EventKind::MemberLeft
            | EventKind::Custom(_) => Audience::Staff,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EventKind::from_wire(&name))
    }
}

/// An event addressed to a room or to one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
    /// When set, only this actor receives the event
    #[serde(default, skip_serializing_if = "is_unset")]
    pub target_id: ActorId,
    /// Recipients fixed when the event was raised, bypassing audience resolution
    #[serde(skip)]
    pub recipients: Option<Vec<ActorId>>,
}

impl DomainEvent {
    /// Event for the audience of `kind` in `room_id`
    pub fn new(kind: EventKind, room_id: RoomId, data: Value) -> Self {
        Self {
            kind,
            room_id,
            timestamp: Utc::now(),
            data,
            target_id: 0,
            recipients: None,
        }
    }

    /// Send only to `actor`, bypassing room membership
    pub fn to_actor(mut self, actor: ActorId) -> Self {
        self.target_id = actor;
        self
    }

    /// Deliver to exactly these members instead of the kind's audience
    ///
    /// Presence events use this so the recipient set is the one observed at
    /// the moment of the transition.
    pub fn to_members(mut self, members: Vec<ActorId>) -> Self {
        self.recipients = Some(members);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names_round_trip() {
        for name in ["new_order", "waiter_call", "menu_update", "member_left"] {
            assert_eq!(EventKind::from_wire(name).as_str(), name);
        }
        assert_eq!(
            EventKind::from_wire("loyalty_points"),
            EventKind::Custom("loyalty_points".into())
        );
    }

    #[test]
    fn test_audience() {
        assert_eq!(EventKind::WaiterCall.audience(), Audience::Staff);
        assert_eq!(EventKind::NewOrder.audience(), Audience::Staff);
        assert_eq!(EventKind::MenuUpdate.audience(), Audience::Everyone);
        assert_eq!(EventKind::StopListUpdate.audience(), Audience::Everyone);
        assert_eq!(EventKind::Custom("x".into()).audience(), Audience::Staff);
    }

    #[test]
    fn test_event_shape() {
        let event = DomainEvent::new(EventKind::WaiterCall, 42, json!({"table": 3}))
            .to_members(vec![1, 2]);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "waiter_call");
        assert_eq!(value["roomId"], 42);
        assert_eq!(value["data"]["table"], 3);
        assert!(value.get("timestamp").is_some());
        assert!(value.get("targetId").is_none());
        assert!(value.get("recipients").is_none());

        let direct = DomainEvent::new(EventKind::OrderStatusUpdate, 42, Value::Null).to_actor(9);
        let value = serde_json::to_value(&direct).unwrap();
        assert_eq!(value["targetId"], 9);
    }

    #[test]
    fn test_deserialize_custom_kind() {
        let event: DomainEvent = serde_json::from_value(json!({
            "type": "happy_hour",
            "roomId": 1,
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(event.kind, EventKind::Custom("happy_hour".into()));
        assert_eq!(event.data, Value::Null);
        assert_eq!(event.target_id, 0);
    }
}
