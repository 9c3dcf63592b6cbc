//! WebSocket server listener
//!
//! Handles the TCP accept loop, upgrades sockets, asks the handler for an
//! identity and spawns a [`Connection`] per admitted client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};
use crate::registry::RegistryConfig;
use crate::server::config::ServerConfig;
use crate::server::handler::{Admission, SessionHandler};
use crate::session::{Connection, HandshakeContext, SessionContext};
use crate::stats::{ConnectionCounters, ServerStats};
use crate::switchboard::Switchboard;

/// WebSocket server
///
/// Must be created inside a tokio runtime: construction spawns the router
/// tasks of its [`Switchboard`].
pub struct SwitchboardServer<H: SessionHandler> {
    config: ServerConfig,
    handler: Arc<H>,
    switchboard: Switchboard,
    counters: Arc<ConnectionCounters>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<H: SessionHandler> SwitchboardServer<H> {
    /// Create a new server with the given configuration and handler
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self::with_registry_config(config, handler, RegistryConfig::default())
    }

    /// Create a new server with custom queue and channel capacities
    pub fn with_registry_config(
        config: ServerConfig,
        handler: H,
        registry_config: RegistryConfig,
    ) -> Self {
        Self::with_switchboard(config, handler, Switchboard::spawn(registry_config))
    }

    /// Create a new server around an existing switchboard
    ///
    /// Lets application code publish through the same routers the server's
    /// connections are registered with.
    pub fn with_switchboard(config: ServerConfig, handler: H, switchboard: Switchboard) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            handler: Arc::new(handler),
            switchboard,
            counters: Arc::new(ConnectionCounters::new()),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Routers and registry shared by every connection
    pub fn switchboard(&self) -> &Switchboard {
        &self.switchboard
    }

    /// Connection counters
    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot()
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Accept connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "WebSocket server listening");

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(()) => {
                self.counters.rejected();
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return;
            }
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let config = self.config.clone();
        let handler = Arc::clone(&self.handler);
        let switchboard = self.switchboard.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_connection(
                socket,
                peer_addr,
                session_id,
                &config,
                handler,
                switchboard,
                &counters,
            )
            .await
            {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }
        });
    }

    fn try_acquire(&self) -> std::result::Result<Option<OwnedSemaphorePermit>, ()> {
        match self.connection_semaphore {
            Some(ref sem) => sem.clone().try_acquire_owned().map(Some).map_err(|_| ()),
            None => Ok(None),
        }
    }
}

async fn serve_connection<H: SessionHandler>(
    socket: TcpStream,
    peer_addr: SocketAddr,
    session_id: u64,
    config: &ServerConfig,
    handler: Arc<H>,
    switchboard: Switchboard,
    counters: &ConnectionCounters,
) -> Result<()> {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);

    let mut uri = Uri::default();
    let capture_uri = |request: &Request, response: Response| {
        uri = request.uri().clone();
        Ok::<_, ErrorResponse>(response)
    };

    let upgrade = tokio_tungstenite::accept_hdr_async_with_config(socket, capture_uri, Some(ws_config));
    let mut ws = match tokio::time::timeout(config.handshake_timeout, upgrade).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            counters.rejected();
            return Err(e.into());
        }
        Err(_) => {
            counters.rejected();
            return Err(Error::HandshakeTimeout);
        }
    };

    let handshake = HandshakeContext {
        session_id,
        peer_addr,
        uri,
    };

    let actor_id = match handler.on_handshake(&handshake).await {
        Admission::Accept(actor_id) if actor_id != 0 => actor_id,
        admission => {
            let reason = match admission {
                Admission::Reject(reason) => reason,
                Admission::Accept(_) => "zero actor id".to_string(),
            };
            counters.rejected();
            tracing::warn!(
                session_id = session_id,
                peer = %peer_addr,
                uri = %handshake.uri,
                reason = %reason,
                "Connection rejected"
            );
            if let Err(e) = ws.close(None).await {
                tracing::trace!(session_id = session_id, error = %e, "Close after reject failed");
            }
            return Err(Error::Rejected(reason));
        }
    };

    tracing::info!(
        session_id = session_id,
        actor = actor_id,
        peer = %peer_addr,
        "Connection admitted"
    );

    counters.opened();
    let context = SessionContext::new(session_id, actor_id, peer_addr);
    let result = Connection::new(context, switchboard, handler).run(ws).await;
    counters.closed();

    result
}
