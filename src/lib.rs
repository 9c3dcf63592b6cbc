//! Real-time connection registry and event router
//!
//! `switchboard` keeps track of which actors (users, staff members, customer
//! sessions) are connected over a WebSocket and routes typed events to the
//! right subset of those connections. Nothing is persisted: delivery is
//! best-effort and a slow consumer only ever loses its own messages.
//!
//! # Architecture
//!
//! ```text
//!                        Switchboard (cloneable)
//!        ┌──────────────┬──────────────────┬──────────────────┐
//!        │ Hub          │ SignalingRouter  │ RoomMultiplexer  │
//!        │ (task)       │ (task)           │ (task + rooms)   │
//!        └──────┬───────┴────────┬─────────┴────────┬─────────┘
//!               │                │                  │
//!               └────────► ConnectionRegistry ◄─────┘
//!                          actor -> mpsc::Sender
//!                                 │ try_send
//!               ┌─────────────────┼─────────────────┐
//!               ▼                 ▼                 ▼
//!          [writer task]     [writer task]     [writer task] ──► WebSocket
//! ```
//!
//! # Example
//! ```no_run
//! use switchboard::{ServerConfig, SessionHandler, SwitchboardServer};
//!
//! struct Handler;
//! impl SessionHandler for Handler {}
//!
//! # async fn example() -> switchboard::Result<()> {
//! let server = SwitchboardServer::new(ServerConfig::default(), Handler);
//! server.run().await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod server;
pub mod session;
pub mod signaling;
pub mod stats;
pub mod switchboard;

pub use crate::switchboard::Switchboard;
pub use error::{Error, Result};
pub use protocol::{ActorId, RoomId};
pub use registry::RegistryConfig;
pub use rooms::{DomainEvent, EventKind, Role};
pub use server::{Admission, ServerConfig, SessionHandler, SwitchboardServer};
pub use session::{HandshakeContext, SessionContext};
