//! Error types
//!
//! Only connection-level failures are errors. Per-message problems (full
//! queues, offline targets, vanished rooms) are dropped and counted instead.

use std::io;

use tokio_tungstenite::tungstenite;

use crate::rooms::RoomError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WebSocket protocol failure (handshake, framing, close)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Frame could not be decoded or an event could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket upgrade did not finish in time
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// The session handler refused the connection
    #[error("Connection rejected: {0}")]
    Rejected(String),

    /// Room membership operation failed
    #[error(transparent)]
    Room(#[from] RoomError),
}
