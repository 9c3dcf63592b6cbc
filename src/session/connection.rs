//! Per-connection reader and writer
//!
//! ```text
//!   WebSocket ──► reader (this task) ──► SignalingRouter / Hub / handler
//!       ▲
//!       └──── writer (spawned) ◄── mpsc::Receiver ◄── ConnectionRegistry
//! ```
//!
//! The registry holds the only sender of the outbound queue. Unregistering
//! or replacing the connection drops it, the writer sees the queue close,
//! sends a close frame and exits. A failed write ends the writer without
//! touching the registry; the reader notices the dead transport on its own.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Message as WsMessage, Utf8Bytes};
use tokio_tungstenite::WebSocketStream;

use super::context::SessionContext;
use crate::error::Result;
use crate::protocol::{ActorId, ClientCommand, InboundFrame, OutboundFrame};
use crate::registry::{ConnectionHandle, ConnectionKey};
use crate::server::SessionHandler;
use crate::switchboard::Switchboard;

/// One admitted WebSocket connection
pub struct Connection<H: SessionHandler> {
    context: SessionContext,
    switchboard: Switchboard,
    handler: Arc<H>,
}

impl<H: SessionHandler> Connection<H> {
    pub fn new(context: SessionContext, switchboard: Switchboard, handler: Arc<H>) -> Self {
        Self {
            context,
            switchboard,
            handler,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Register, pump frames until the peer goes away, then clean up
    ///
    /// Returns the error that ended the read loop, if any. Cleanup runs
    /// either way.
    pub async fn run<S>(self, socket: WebSocketStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let key = self.context.key();
        let registry = Arc::clone(self.switchboard.registry());
        let capacity = registry.config().outbound_queue_capacity;

        let (handle, rx) = ConnectionHandle::channel(key, capacity);
        let (sink, stream) = socket.split();

        tokio::spawn(write_loop(sink, rx, key));
        registry.register(handle).await;
        self.handler.on_connected(&self.context).await;

        let result = self.read_loop(stream).await;

        if registry.unregister(key).await {
            evict_if_offline(&self.switchboard, key.actor_id).await;
            self.handler.on_disconnected(&self.context).await;
        }

        tracing::info!(
            session_id = key.session_id,
            actor = key.actor_id,
            duration_ms = self.context.duration().as_millis() as u64,
            "Connection closed"
        );

        result
    }

    async fn read_loop<S>(&self, mut stream: SplitStream<WebSocketStream<S>>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        while let Some(message) = stream.next().await {
            let frame = match message? {
                WsMessage::Text(text) => InboundFrame::from_text(text.as_str())?,
                WsMessage::Binary(data) => InboundFrame::from_slice(&data)?,
                WsMessage::Close(_) => {
                    tracing::debug!(session_id = self.context.session_id, "Close frame received");
                    break;
                }
                // Control frames are answered by the transport
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            self.dispatch(frame).await;
        }

        Ok(())
    }

    async fn dispatch(&self, frame: InboundFrame) {
        let actor = self.context.actor_id;

        match frame.into_command(actor) {
            ClientCommand::Signal(message) => self.switchboard.signaling().relay(actor, message),
            ClientCommand::RoomSignal(message) => {
                self.switchboard.signaling().relay_in_room(actor, message)
            }
            ClientCommand::Typing(message) => self.switchboard.hub().publish(message),
            ClientCommand::Rejected { frame, reason } => {
                tracing::debug!(
                    session_id = self.context.session_id,
                    actor = actor,
                    kind = %frame.kind,
                    reason = reason,
                    "Inbound frame rejected"
                );
            }
            ClientCommand::Unrecognized(frame) => {
                self.handler.on_frame(&self.context, &frame).await;
                tracing::debug!(
                    session_id = self.context.session_id,
                    actor = actor,
                    kind = %frame.kind,
                    "Unrecognized frame ignored"
                );
            }
        }
    }
}

/// Drop the actor's room membership unless a newer session has registered
/// since this one was removed
async fn evict_if_offline(switchboard: &Switchboard, actor: ActorId) -> bool {
    if switchboard.registry().session_of(actor).await.is_some() {
        tracing::debug!(actor = actor, "Actor reconnected, membership kept");
        return false;
    }
    switchboard.rooms().evict(actor).await;
    true
}

async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, WsMessage>,
    mut rx: mpsc::Receiver<OutboundFrame>,
    key: ConnectionKey,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let text = match Utf8Bytes::try_from(frame.into_bytes()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(connection = %key, error = %e, "Outbound frame is not UTF-8, dropped");
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::Text(text)).await {
            tracing::debug!(connection = %key, error = %e, "Write failed, writer stopped");
            return;
        }
    }

    tracing::debug!(connection = %key, "Outbound queue closed");
    if let Err(e) = sink.send(WsMessage::Close(None)).await {
        tracing::trace!(connection = %key, error = %e, "Close frame not sent");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::{json, Value};
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role as WsRole;

    use super::*;
    use crate::registry::RegistryConfig;
    use crate::rooms::Role;

    #[derive(Default)]
    struct Recorder {
        disconnected: AtomicUsize,
        unrecognized: AtomicUsize,
    }

    impl SessionHandler for Recorder {
        async fn on_frame(&self, _ctx: &SessionContext, _frame: &InboundFrame) {
            self.unrecognized.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_disconnected(&self, _ctx: &SessionContext) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }
    }

    type Client = WebSocketStream<DuplexStream>;

    async fn open(
        board: &Switchboard,
        handler: &Arc<Recorder>,
        actor: ActorId,
        session_id: u64,
    ) -> (Client, tokio::task::JoinHandle<Result<()>>) {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, WsRole::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, WsRole::Client, None).await;

        let ctx = SessionContext::new(session_id, actor, "127.0.0.1:4000".parse().unwrap());
        let connection = Connection::new(ctx, board.clone(), Arc::clone(handler));
        let task = tokio::spawn(connection.run(server));

        wait_for_session(board, actor, session_id).await;
        (client, task)
    }

    async fn wait_for_session(board: &Switchboard, actor: ActorId, session_id: u64) {
        for _ in 0..200 {
            if board.registry().session_of(actor).await == Some(session_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {} for actor {} never registered", session_id, actor);
    }

    async fn next_json(client: &mut Client) -> Value {
        loop {
            match client.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_offer_relayed_between_connections() {
        let board = Switchboard::spawn(RegistryConfig::default());
        let handler = Arc::new(Recorder::default());

        let (mut caller, _t1) = open(&board, &handler, 3, 1).await;
        let (mut callee, _t2) = open(&board, &handler, 5, 2).await;

        let offer = json!({ "type": "offer", "targetId": 5, "payload": "sdp1" });
        caller
            .send(WsMessage::Text(offer.to_string().into()))
            .await
            .unwrap();

        let received = next_json(&mut callee).await;
        assert_eq!(received["type"], "offer");
        assert_eq!(received["senderId"], 3);
        assert_eq!(received["targetId"], 5);
        assert_eq!(received["payload"], "sdp1");
    }

    #[tokio::test]
    async fn test_unknown_frame_goes_to_handler() {
        let board = Switchboard::spawn(RegistryConfig::default());
        let handler = Arc::new(Recorder::default());

        let (mut client, _task) = open(&board, &handler, 8, 1).await;
        let frame = json!({ "type": "mystery", "payload": {} });
        client
            .send(WsMessage::Text(frame.to_string().into()))
            .await
            .unwrap();
        // A typing indicator to self acts as a fence behind the unknown frame
        let typing = json!({ "type": "typing", "targetId": 8 });
        client
            .send(WsMessage::Text(typing.to_string().into()))
            .await
            .unwrap();

        let echoed = next_json(&mut client).await;
        assert_eq!(echoed["type"], "typing");
        assert_eq!(handler.unrecognized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_cleans_up_registry_and_rooms() {
        let board = Switchboard::spawn(RegistryConfig::default());
        let handler = Arc::new(Recorder::default());

        let (mut client, task) = open(&board, &handler, 7, 1).await;
        board.rooms().join(42, 7, Role::Staff).await.unwrap();

        client.close(None).await.unwrap();
        task.await.unwrap().unwrap();

        assert!(!board.registry().is_online(7).await);
        assert_eq!(board.rooms().room_of(7).await, None);
        assert!(!board.rooms().room_exists(42).await);
        assert_eq!(handler.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_ends_connection() {
        let board = Switchboard::spawn(RegistryConfig::default());
        let handler = Arc::new(Recorder::default());

        let (mut client, task) = open(&board, &handler, 4, 1).await;
        client
            .send(WsMessage::Text("not json".to_string().into()))
            .await
            .unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(crate::Error::Json(_))));
        assert!(!board.registry().is_online(4).await);
    }

    #[tokio::test]
    async fn test_replacement_closes_old_connection() {
        let board = Switchboard::spawn(RegistryConfig::default());
        let handler = Arc::new(Recorder::default());

        let (mut old, old_task) = open(&board, &handler, 9, 1).await;
        let (_new, _new_task) = open(&board, &handler, 9, 2).await;

        match old.next().await.unwrap().unwrap() {
            WsMessage::Close(_) => {}
            other => panic!("expected close, got {:?}", other),
        }
        // Drive the closing handshake so the old reader sees the end
        while let Some(Ok(_)) = old.next().await {}

        old_task.await.unwrap().ok();

        assert_eq!(board.registry().session_of(9).await, Some(2));
        assert_eq!(handler.disconnected.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_membership_of_reconnected_actor() {
        let board = Switchboard::spawn(RegistryConfig::default());
        board.rooms().join(42, 7, Role::Staff).await.unwrap();

        // A second session registered before the first one cleaned up
        let key = ConnectionKey {
            actor_id: 7,
            session_id: 2,
        };
        let (handle, _rx) = ConnectionHandle::channel(key, 4);
        board.registry().register(handle).await;

        assert!(!evict_if_offline(&board, 7).await);
        assert_eq!(board.rooms().room_of(7).await, Some(42));

        assert!(board.registry().unregister(key).await);
        assert!(evict_if_offline(&board, 7).await);
        assert_eq!(board.rooms().room_of(7).await, None);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let board = Switchboard::spawn(RegistryConfig::default());
        let handler = Arc::new(Recorder::default());

        let (mut caller, _t1) = open(&board, &handler, 12, 1).await;
        let (mut callee, _t2) = open(&board, &handler, 13, 2).await;
        for n in 0..3 {
            let candidate = json!({ "type": "candidate", "targetId": 13, "payload": n });
            caller
                .send(WsMessage::Text(candidate.to_string().into()))
                .await
                .unwrap();
        }

        for n in 0..3 {
            let frame = next_json(&mut callee).await;
            assert_eq!(frame["type"], "candidate");
            assert_eq!(frame["senderId"], 12);
            assert_eq!(frame["payload"], n);
        }
    }
}
