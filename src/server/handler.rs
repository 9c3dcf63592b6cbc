//! Session event sink
//!
//! The only way the core calls back into the embedding application. Every
//! method has a default, so an empty `impl SessionHandler for T {}` gives a
//! server that admits `/ws/{id}` connections and ignores unknown frames.

use std::future::Future;

use tokio_tungstenite::tungstenite::http::Uri;

use crate::protocol::{ActorId, InboundFrame};
use crate::session::{HandshakeContext, SessionContext};

/// Outcome of the admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Admit the connection under this identity
    Accept(ActorId),
    /// Close the connection with a reason
    Reject(String),
}

/// Callbacks invoked over the life of a connection
///
/// Implementations may use `async fn` directly.
pub trait SessionHandler: Send + Sync + 'static {
    /// Decide whether an upgraded connection is admitted, and as whom
    ///
    /// Authentication belongs to the caller; the default trusts the request
    /// path.
    fn on_handshake(&self, ctx: &HandshakeContext) -> impl Future<Output = Admission> + Send {
        let admission = match actor_from_uri(&ctx.uri) {
            Some(actor) => Admission::Accept(actor),
            None => Admission::Reject(format!("no actor id in {}", ctx.uri)),
        };
        async move { admission }
    }

    /// Called once the connection is registered
    fn on_connected(&self, _ctx: &SessionContext) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called for inbound frames with a type the core does not route
    fn on_frame(
        &self,
        _ctx: &SessionContext,
        _frame: &InboundFrame,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called when the live connection for an identity goes away
    ///
    /// Not called for a connection that was already replaced by a newer one.
    fn on_disconnected(&self, _ctx: &SessionContext) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Extract an actor id from `/ws/{id}` or `?userId={id}`
///
/// The path segment wins when both are present. Zero is not an identity.
pub fn actor_from_uri(uri: &Uri) -> Option<ActorId> {
    let from_path = uri
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<ActorId>().ok());

    let from_query = || {
        uri.query()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == "userId")
            .and_then(|(_, value)| value.parse::<ActorId>().ok())
    };

    from_path
        .filter(|id| *id != 0)
        .or_else(|| from_query().filter(|id| *id != 0))
}
