//! Simple switchboard server
//!
//! Run with: cargo run --example simple_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example simple_server                    # binds to 0.0.0.0:8000
//!   cargo run --example simple_server localhost          # binds to 127.0.0.1:8000
//!   cargo run --example simple_server 127.0.0.1:8001     # binds to 127.0.0.1:8001
//!
//! ## Connecting
//!
//! Each client connects as an actor id taken from the path:
//!   websocat ws://localhost:8000/ws/7
//!   websocat ws://localhost:8000/ws/9
//!
//! ## Frames
//!
//! Relay an offer from 7 to 9:
//!   {"type":"offer","targetId":9,"payload":"sdp"}
//!
//! Join a room (handled by this demo, not by the core):
//!   {"type":"join_room","roomId":42,"payload":{"role":"staff"}}
//!   {"type":"join_room","roomId":42,"payload":{"role":"guest"}}
//!
//! Call a waiter as a guest; only staff in room 42 are told:
//!   {"type":"call_waiter","roomId":42,"payload":{"table":5}}

use std::net::SocketAddr;
use std::time::Duration;

use switchboard::protocol::InboundFrame;
use switchboard::{
    RegistryConfig, Role, ServerConfig, SessionContext, SessionHandler, Switchboard,
    SwitchboardServer,
};

/// Handler that logs lifecycle events and implements a tiny room protocol
struct DemoHandler {
    switchboard: Switchboard,
}

impl SessionHandler for DemoHandler {
    async fn on_connected(&self, ctx: &SessionContext) {
        println!("[{}] actor {} connected from {}", ctx.session_id, ctx.actor_id, ctx.peer_addr);
    }

    async fn on_frame(&self, ctx: &SessionContext, frame: &InboundFrame) {
        let rooms = self.switchboard.rooms();

        match frame.kind.as_str() {
            "join_room" => {
                let role = match frame.payload["role"].as_str() {
                    Some("staff") => Role::Staff,
                    _ => Role::Guest,
                };
                if let Err(e) = rooms.join(frame.room_id, ctx.actor_id, role).await {
                    println!("[{}] join failed: {}", ctx.session_id, e);
                }
            }
            "leave_room" => rooms.leave(frame.room_id, ctx.actor_id).await,
            "call_waiter" => rooms.notify_waiter_call(frame.room_id, frame.payload.clone()),
            other => println!("[{}] ignoring frame type '{}'", ctx.session_id, other),
        }
    }

    async fn on_disconnected(&self, ctx: &SessionContext) {
        println!(
            "[{}] actor {} disconnected after {:?}",
            ctx.session_id,
            ctx.actor_id,
            ctx.duration()
        );
    }
}

/// Parse bind address from command line argument.
///
/// Accepts "IP:PORT", "IP" or "localhost[:PORT]".
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8000;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config = config.bind(parse_bind_addr(&arg)?);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("switchboard=debug".parse()?)
                .add_directive("simple_server=debug".parse()?),
        )
        .init();

    let switchboard = Switchboard::spawn(RegistryConfig::default());
    let handler = DemoHandler {
        switchboard: switchboard.clone(),
    };
    let server = SwitchboardServer::with_switchboard(config, handler, switchboard.clone());

    println!("Starting switchboard on ws://{}/ws/{{actor_id}}", server.bind_addr());

    // Periodic delivery stats
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let stats = switchboard.stats();
            let online = switchboard.registry().connection_count().await;
            tracing::info!(
                online = online,
                delivered = stats.delivered,
                dropped = stats.dropped(),
                "Delivery stats"
            );
        }
    });

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await?;

    println!("Shut down");
    Ok(())
}
