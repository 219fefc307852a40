//! Fan-out of published messages to subscribers.

use std::sync::Arc;

use crate::domain::{MessageIdGenerator, SessionId, SessionRegistry, SubscriptionTable};
use crate::error::BrokerError;
use crate::stomp::{Command, Frame};

/// Content type stamped on every MESSAGE frame.
pub const MESSAGE_CONTENT_TYPE: &str = "application/json";

/// Delivers MESSAGE frames to subscribers.
///
/// Delivery is at-most-once with no acknowledgement: each frame is pushed
/// onto the recipient's outbound queue and forgotten. A recipient whose
/// session has gone away is skipped; the rest of the fan-out proceeds.
#[derive(Debug, Clone)]
pub struct BroadcastRouter {
    sessions: Arc<SessionRegistry>,
    subscriptions: Arc<SubscriptionTable>,
    message_ids: Arc<MessageIdGenerator>,
}

impl BroadcastRouter {
    /// Creates a router over the given tables.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionRegistry>,
        subscriptions: Arc<SubscriptionTable>,
        message_ids: Arc<MessageIdGenerator>,
    ) -> Self {
        Self {
            sessions,
            subscriptions,
            message_ids,
        }
    }

    /// Sends `body` to every subscription bound to `destination`.
    ///
    /// Returns the number of MESSAGE frames queued. Zero subscribers is not
    /// an error.
    pub async fn broadcast(&self, destination: &str, body: &str) -> usize {
        let recipients = self.subscriptions.destinations_matching(destination).await;
        let mut delivered = 0;

        for (session, subscription_id) in recipients {
            match self
                .deliver(session, &subscription_id, destination, body)
                .await
            {
                Ok(()) => {
                    delivered += 1;
                    tracing::debug!(
                        %session,
                        subscription = %subscription_id,
                        %destination,
                        "message delivered"
                    );
                }
                Err(err) => {
                    tracing::debug!(%session, error = %err, "skipping broadcast recipient");
                }
            }
        }

        delivered
    }

    /// Queues one MESSAGE frame for a single subscription.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionNotFound`] if the session is no longer
    /// registered.
    pub async fn deliver(
        &self,
        session: SessionId,
        subscription_id: &str,
        destination: &str,
        body: &str,
    ) -> Result<(), BrokerError> {
        let frame = self.message_frame(subscription_id, destination, body);
        self.sessions.send(session, frame.encode()).await
    }

    /// Builds a MESSAGE frame carrying a fresh `message-id`.
    #[must_use]
    pub fn message_frame(&self, subscription_id: &str, destination: &str, body: &str) -> Frame {
        Frame::new(Command::Message)
            .with_header("subscription", subscription_id)
            .with_header("destination", destination)
            .with_header("message-id", self.message_ids.next_id().to_string())
            .with_header("content-type", MESSAGE_CONTENT_TYPE)
            .with_body(body)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    struct Fixture {
        sessions: Arc<SessionRegistry>,
        subscriptions: Arc<SubscriptionTable>,
        router: BroadcastRouter,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(SessionRegistry::new());
        let subscriptions = Arc::new(SubscriptionTable::new());
        let router = BroadcastRouter::new(
            Arc::clone(&sessions),
            Arc::clone(&subscriptions),
            Arc::new(MessageIdGenerator::new()),
        );
        Fixture {
            sessions,
            subscriptions,
            router,
        }
    }

    fn decode(raw: Option<String>) -> Frame {
        let Some(raw) = raw else {
            panic!("expected a queued frame");
        };
        let Ok(frame) = Frame::decode(&raw) else {
            panic!("queued frame should decode");
        };
        frame
    }

    #[tokio::test]
    async fn no_subscribers_delivers_nothing() {
        let fx = fixture();
        assert_eq!(fx.router.broadcast("/topic/empty", "hi").await, 0);
    }

    #[tokio::test]
    async fn each_subscription_gets_its_own_copy() {
        let fx = fixture();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = SessionId::new();
        let b = SessionId::new();
        fx.sessions.register(a, tx_a).await;
        fx.sessions.register(b, tx_b).await;
        fx.subscriptions.subscribe(a, "sub-a", "/topic/chat").await;
        fx.subscriptions.subscribe(b, "sub-b", "/topic/chat").await;

        assert_eq!(fx.router.broadcast("/topic/chat", "hello").await, 2);

        let msg_a = decode(rx_a.recv().await);
        let msg_b = decode(rx_b.recv().await);
        assert_eq!(msg_a.command(), &Command::Message);
        assert_eq!(msg_a.header("subscription"), Some("sub-a"));
        assert_eq!(msg_b.header("subscription"), Some("sub-b"));
        assert_eq!(msg_a.header("destination"), Some("/topic/chat"));
        assert_eq!(msg_a.header("content-type"), Some(MESSAGE_CONTENT_TYPE));
        assert_eq!(msg_a.body(), "hello");
        assert_ne!(msg_a.header("message-id"), msg_b.header("message-id"));
    }

    #[tokio::test]
    async fn stale_subscriber_is_skipped() {
        let fx = fixture();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let live = SessionId::new();
        let gone = SessionId::new();
        fx.sessions.register(live, tx_live).await;
        // Subscription left behind by a session that already unregistered.
        fx.subscriptions.subscribe(gone, "sub-0", "/topic/x").await;
        fx.subscriptions.subscribe(live, "sub-0", "/topic/x").await;

        assert_eq!(fx.router.broadcast("/topic/x", "data").await, 1);
        assert_eq!(decode(rx_live.recv().await).body(), "data");
    }

    #[tokio::test]
    async fn session_with_two_matching_subscriptions_gets_two_frames() {
        let fx = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = SessionId::new();
        fx.sessions.register(session, tx).await;
        fx.subscriptions.subscribe(session, "one", "/topic/x").await;
        fx.subscriptions.subscribe(session, "two", "/topic/x").await;

        assert_eq!(fx.router.broadcast("/topic/x", "b").await, 2);
        let mut ids = vec![
            decode(rx.recv().await).header("subscription").map(str::to_string),
            decode(rx.recv().await).header("subscription").map(str::to_string),
        ];
        ids.sort();
        assert_eq!(ids, vec![Some("one".to_string()), Some("two".to_string())]);
    }

    #[test]
    fn message_ids_increase() {
        let fx = fixture();
        let first = fx.router.message_frame("s", "/d", "");
        let second = fx.router.message_frame("s", "/d", "");
        let parse = |f: &Frame| f.header("message-id").and_then(|v| v.parse::<u64>().ok());
        assert!(parse(&first) < parse(&second));
    }
}
