//! Typed notification helpers
//!
//! Thin wrappers that build a [`DomainEvent`] with a fixed payload shape and
//! hand it to [`RoomMultiplexer::dispatch`]. None of them wait.

use serde_json::{json, Value};

use super::event::{DomainEvent, EventKind};
use super::multiplexer::RoomMultiplexer;
use crate::protocol::{ActorId, RoomId};

impl RoomMultiplexer {
    /// A new order arrived; `order` is forwarded to staff as-is
    pub fn notify_new_order(&self, room_id: RoomId, order: Value) {
        self.dispatch(DomainEvent::new(EventKind::NewOrder, room_id, order));
    }

    /// An order changed status
    ///
    /// Staff get the room event. The customer, when known, gets a direct copy
    /// whether or not it is a room member.
    pub fn notify_order_status_update(
        &self,
        room_id: RoomId,
        order_id: u64,
        status: &str,
        customer: Option<ActorId>,
    ) {
        let data = json!({ "orderId": order_id, "status": status });
        self.fan_out(EventKind::OrderStatusUpdate, room_id, data, customer);
    }

    pub fn notify_order_cancelled(
        &self,
        room_id: RoomId,
        order_id: u64,
        reason: Option<&str>,
        customer: Option<ActorId>,
    ) {
        let data = json!({ "orderId": order_id, "reason": reason });
        self.fan_out(EventKind::OrderCancelled, room_id, data, customer);
    }

    pub fn notify_waiter_call(&self, room_id: RoomId, call: Value) {
        self.dispatch(DomainEvent::new(EventKind::WaiterCall, room_id, call));
    }

    /// A waiter picked up a call; the caller, when known, is told directly
    pub fn notify_waiter_acknowledged(
        &self,
        room_id: RoomId,
        call_id: u64,
        waiter: ActorId,
        caller: Option<ActorId>,
    ) {
        let data = json!({ "callId": call_id, "waiterId": waiter });
        self.fan_out(EventKind::WaiterAcknowledged, room_id, data, caller);
    }

    /// A menu item was created, changed or removed
    pub fn notify_menu_update(&self, room_id: RoomId, update_type: &str, item_id: u64) {
        self.dispatch(DomainEvent::new(
            EventKind::MenuUpdate,
            room_id,
            json!({ "updateType": update_type, "itemId": item_id }),
        ));
    }

    /// Dishes went on or off the stop list
    pub fn notify_stop_list_update(&self, room_id: RoomId, dish_ids: &[u64], is_available: bool) {
        self.dispatch(DomainEvent::new(
            EventKind::StopListUpdate,
            room_id,
            json!({ "dishIds": dish_ids, "isAvailable": is_available }),
        ));
    }

    fn fan_out(&self, kind: EventKind, room_id: RoomId, data: Value, direct: Option<ActorId>) {
        let event = DomainEvent::new(kind, room_id, data);
        if let Some(actor) = direct.filter(|actor| *actor != 0) {
            self.dispatch(event.clone().to_actor(actor));
        }
        self.dispatch(event);
    }
}
