//! Rooms and role-filtered event dispatch
//!
//! A room groups actor identities under two roles. Domain events addressed
//! to a room reach the audience their kind declares; events with a target
//! bypass membership entirely.
//!
//! ```text
//!   notify_* / dispatch()
//!            │
//!            ▼  try_send
//!   ┌─────────────────┐   resolve under   ┌───────────┐
//!   │   RoomWorker    │──── read lock ───►│ RoomTable │
//!   └────────┬────────┘                   └───────────┘
//!            │ deliver_many (lock released)
//!            ▼
//!   ┌─────────────────────┐
//!   │ ConnectionRegistry  │──► per-connection queues
//!   └─────────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod multiplexer;
mod notify;
pub mod room;

pub use error::RoomError;
pub use event::{Audience, DomainEvent, EventKind};
pub use multiplexer::{RoomMultiplexer, RoomWorker};
pub use room::{Role, Room};
