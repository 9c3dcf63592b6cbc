//! WebSocket server
//!
//! Accepts TCP connections, performs the WebSocket upgrade, resolves the
//! caller's identity through [`SessionHandler::on_handshake`] and hands the
//! socket to a session.

pub mod config;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use handler::{actor_from_uri, Admission, SessionHandler};
pub use listener::SwitchboardServer;
