//! Handler context
//!
//! Read-only session information passed to [`SessionHandler`] callbacks.
//!
//! [`SessionHandler`]: crate::server::SessionHandler

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio_tungstenite::tungstenite::http::Uri;

use crate::protocol::ActorId;
use crate::registry::ConnectionKey;

/// Context for a connection that finished the upgrade but has no identity yet
#[derive(Debug, Clone)]
pub struct HandshakeContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Request target of the upgrade (path and query)
    pub uri: Uri,
}

/// Context for an admitted connection
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Identity the connection was admitted under
    pub actor_id: ActorId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// When the connection was admitted
    pub connected_at: Instant,
}

impl SessionContext {
    pub fn new(session_id: u64, actor_id: ActorId, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            actor_id,
            peer_addr,
            connected_at: Instant::now(),
        }
    }

    /// Registry key for this connection
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            actor_id: self.actor_id,
            session_id: self.session_id,
        }
    }

    /// Time since admission
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_key() {
        let ctx = SessionContext::new(12, 7, "127.0.0.1:9000".parse().unwrap());
        let key = ctx.key();

        assert_eq!(key.actor_id, 7);
        assert_eq!(key.session_id, 12);
        assert!(ctx.duration() < Duration::from_secs(5));
    }
}
