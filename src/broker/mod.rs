//! Broker core: dispatcher, router, and the facade that owns them.
//!
//! [`Broker`] is the single entry point the transport layer talks to. It
//! owns the session registry and subscription table and wires the
//! [`FrameDispatcher`] and [`BroadcastRouter`] to them.
//!
//! ```text
//! transport text ─► Frame::decode ─► FrameDispatcher ─┬─► SubscriptionTable
//!                                                     ├─► SessionRegistry (replies)
//!                                                     └─► BroadcastRouter ─► SessionRegistry
//! ```

pub mod dispatcher;
pub mod router;

use std::sync::Arc;

pub use dispatcher::FrameDispatcher;
pub use router::BroadcastRouter;

use crate::domain::{MessageIdGenerator, Outbound, SessionId, SessionRegistry, SubscriptionTable};
use crate::error::BrokerError;
use crate::stomp::Frame;

/// Owned broker state plus its frame handling pipeline.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
#[derive(Debug)]
pub struct Broker {
    sessions: Arc<SessionRegistry>,
    subscriptions: Arc<SubscriptionTable>,
    dispatcher: FrameDispatcher,
    router: BroadcastRouter,
}

impl Broker {
    /// Creates a broker with empty tables.
    #[must_use]
    pub fn new() -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let subscriptions = Arc::new(SubscriptionTable::new());
        let router = BroadcastRouter::new(
            Arc::clone(&sessions),
            Arc::clone(&subscriptions),
            Arc::new(MessageIdGenerator::new()),
        );
        let dispatcher =
            FrameDispatcher::new(Arc::clone(&sessions), Arc::clone(&subscriptions), router.clone());
        Self {
            sessions,
            subscriptions,
            dispatcher,
            router,
        }
    }

    /// Registers a newly opened transport connection and returns the id
    /// assigned to its session.
    pub async fn open_session(&self, outbound: Outbound) -> SessionId {
        let session = SessionId::new();
        self.sessions.register(session, outbound).await;
        tracing::info!(%session, "client connected");
        session
    }

    /// Tears a session down after its transport closed.
    ///
    /// Subscriptions go first so that a broadcast started after this call
    /// cannot select the session; a broadcast already enumerating
    /// subscribers finds the registry entry gone and skips it.
    pub async fn close_session(&self, session: SessionId) {
        let removed = self.subscriptions.unsubscribe_all(session).await;
        self.sessions.unregister(session).await;
        tracing::info!(%session, subscriptions = removed, "client disconnected");
    }

    /// Closes every session at once, for server shutdown.
    ///
    /// Each connection sees its outbound queue close and ends its
    /// transport; SockJS clients receive `c[3000,"Go away!"]`. Returns the
    /// number of sessions closed.
    pub async fn shutdown(&self) -> usize {
        let subscriptions = self.subscriptions.clear().await;
        let sessions = self.sessions.drain().await;
        tracing::info!(sessions = sessions.len(), subscriptions, "broker shut down");
        sessions.len()
    }

    /// Decodes and dispatches one transport message received on `session`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MalformedFrame`] if the text has no command
    /// line, or any error reported by [`FrameDispatcher::dispatch`]. None
    /// of them affects the session; callers log and carry on.
    pub async fn handle_text(&self, session: SessionId, raw: &str) -> Result<(), BrokerError> {
        tracing::debug!(%session, len = raw.len(), "received frame");
        let frame = Frame::decode(raw)?;
        self.dispatcher.dispatch(session, &frame).await
    }

    /// Publishes `body` to `destination` as if a client had sent it.
    pub async fn broadcast(&self, destination: &str, body: &str) -> usize {
        self.router.broadcast(destination, body).await
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Number of subscriptions across all sessions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count().await
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::stomp::Command;

    async fn open(broker: &Broker) -> (SessionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (broker.open_session(tx).await, rx)
    }

    #[tokio::test]
    async fn malformed_text_is_rejected_without_closing_session() {
        let broker = Broker::new();
        let (session, _rx) = open(&broker).await;

        assert_eq!(
            broker.handle_text(session, "").await,
            Err(BrokerError::MalformedFrame)
        );
        assert_eq!(broker.session_count().await, 1);
        assert!(broker.handle_text(session, "CONNECT\n\n\0").await.is_ok());
    }

    #[tokio::test]
    async fn close_session_purges_both_tables() {
        let broker = Broker::new();
        let (a, mut rx_a) = open(&broker).await;
        let (b, _rx_b) = open(&broker).await;
        let _ = broker
            .handle_text(a, "SUBSCRIBE\nid:sub-0\ndestination:/topic/chat\n\n\0")
            .await;
        let _ = rx_a.recv().await;
        assert_eq!(broker.subscription_count().await, 1);

        broker.close_session(a).await;
        assert_eq!(broker.session_count().await, 1);
        assert_eq!(broker.subscription_count().await, 0);

        let _ = broker
            .handle_text(b, "SEND\ndestination:/topic/chat\n\nafter close\0")
            .await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_from_server_side() {
        let broker = Broker::new();
        let (session, mut rx) = open(&broker).await;
        let _ = broker
            .handle_text(session, "SUBSCRIBE\nid:s\ndestination:/topic/news\n\n\0")
            .await;
        let _ = rx.recv().await;

        assert_eq!(broker.broadcast("/topic/news", "{}").await, 1);
        let Some(raw) = rx.recv().await else {
            panic!("expected MESSAGE");
        };
        let Ok(frame) = Frame::decode(&raw) else {
            panic!("MESSAGE should decode");
        };
        assert_eq!(frame.command(), &Command::Message);
        assert_eq!(frame.body(), "{}");
    }

    #[tokio::test]
    async fn shutdown_closes_every_queue() {
        let broker = Broker::new();
        let (a, mut rx_a) = open(&broker).await;
        let (_b, mut rx_b) = open(&broker).await;
        let _ = broker
            .handle_text(a, "SUBSCRIBE\nid:s\ndestination:/topic/news\n\n\0")
            .await;
        let _ = rx_a.recv().await;

        assert_eq!(broker.shutdown().await, 2);
        assert_eq!(broker.session_count().await, 0);
        assert_eq!(broker.subscription_count().await, 0);
        assert_eq!(rx_a.recv().await, None);
        assert_eq!(rx_b.recv().await, None);
    }
}
