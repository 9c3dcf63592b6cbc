//! Pairwise signaling relay
//!
//! Routes offer/answer/candidate/hangup messages between two actors, either
//! globally or inside a room. There is no room-wide signaling broadcast.

pub mod router;

pub use router::{Relay, SignalingRouter, SignalingWorker};
