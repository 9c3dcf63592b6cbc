//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default upper bound for a single inbound WebSocket message
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// The WebSocket upgrade must complete within this time
    pub handshake_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Largest inbound message accepted before the connection is dropped
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            handshake_timeout: Duration::from_secs(10),
            tcp_nodelay: true, // Signaling is latency bound
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the inbound message limit; never below 1 KiB
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size.max(1024);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.max_message_size, 64 * 1024);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9001);
    }

    #[test]
    fn test_builder_chain() {
        let config = ServerConfig::default()
            .max_connections(100)
            .handshake_timeout(Duration::from_secs(3))
            .tcp_nodelay(false)
            .max_message_size(10);

        assert_eq!(config.max_connections, 100);
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
        assert!(!config.tcp_nodelay);
        assert_eq!(config.max_message_size, 1024);
    }
}
