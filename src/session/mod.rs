//! Connection sessions
//!
//! A session is one admitted WebSocket bound to one actor identity. It owns
//! the receiving half of its outbound queue and runs two loops: the reader
//! that decodes and dispatches client frames, and the writer that flushes
//! routed frames to the socket.

pub mod connection;
pub mod context;

pub use connection::Connection;
pub use context::{HandshakeContext, SessionContext};
