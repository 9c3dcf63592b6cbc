//! Connection registry and hub
//!
//! The registry maps each connected actor to the outbound queue of its live
//! connection. Routers never touch sockets: they serialize an event once and
//! push the shared frame onto the queues of the resolved recipients.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ConnectionRegistry>
//!                   ┌──────────────────────────────┐
//!                   │ connections: HashMap<Actor,  │
//!                   │   ConnectionHandle {         │
//!                   │     tx: mpsc::Sender,        │
//!                   │   }                          │
//!                   │ >                            │
//!                   └──────────────┬───────────────┘
//!                                  │ try_send (never waits)
//!         ┌────────────────────────┼────────────────────────┐
//!         ▼                        ▼                        ▼
//!    [writer task]            [writer task]            [writer task]
//!    rx.recv()                rx.recv()                rx.recv()
//!         │                        │                        │
//!         └──► ws.send() ──► TCP   └──► ...                 └──► ...
//! ```
//!
//! # Backpressure
//!
//! Every queue is bounded. A full queue drops the frame for that recipient
//! only; publishers and other recipients are never slowed down.

pub mod config;
pub mod entry;
pub mod hub;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ConnectionHandle, ConnectionKey, Delivery};
pub use hub::{Hub, HubWorker};
pub use store::ConnectionRegistry;
