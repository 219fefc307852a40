//! Frame dispatcher: maps each client command to its handler.
//!
//! | Command              | Effect                         | Reply                              |
//! |----------------------|--------------------------------|------------------------------------|
//! | `CONNECT` / `STOMP`  | session marked connected       | `CONNECTED`                        |
//! | `SUBSCRIBE`          | subscription stored            | `RECEIPT` (if asked), welcome `MESSAGE` |
//! | `UNSUBSCRIBE`        | one subscription removed       | `RECEIPT` (if asked)               |
//! | `SEND`               | fan-out through the router     | none                               |
//! | `DISCONNECT`         | all session subscriptions gone | `RECEIPT` (if asked)               |
//! | anything else        | none                           | none                               |
//!
//! The dispatcher does not require `CONNECT` before other frames. No
//! credentials are checked and no `ERROR` frame is ever sent: a frame that
//! lacks a required header is skipped and reported to the caller.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use super::router::BroadcastRouter;
use crate::domain::{ProtocolState, SessionId, SessionRegistry, SubscriptionTable};
use crate::error::BrokerError;
use crate::stomp::{Command, Frame};

/// Protocol version advertised in `CONNECTED`.
pub const STOMP_VERSION: &str = "1.2";

/// Heart-beat capability advertised in `CONNECTED`. No timers back it.
pub const HEART_BEAT: &str = "10000,10000";

/// Routes decoded frames from a session to their handlers.
#[derive(Debug, Clone)]
pub struct FrameDispatcher {
    sessions: Arc<SessionRegistry>,
    subscriptions: Arc<SubscriptionTable>,
    router: BroadcastRouter,
}

impl FrameDispatcher {
    /// Creates a dispatcher over the given tables.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionRegistry>,
        subscriptions: Arc<SubscriptionTable>,
        router: BroadcastRouter,
    ) -> Self {
        Self {
            sessions,
            subscriptions,
            router,
        }
    }

    /// Handles one frame received from `session`.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::UnrecognizedCommand`] if no handler exists for the
    ///   frame's command.
    /// - [`BrokerError::MissingHeader`] if a required header is absent; the
    ///   operation is skipped.
    /// - [`BrokerError::SessionNotFound`] if a reply could not be queued
    ///   because the session is gone.
    pub async fn dispatch(&self, session: SessionId, frame: &Frame) -> Result<(), BrokerError> {
        let command = frame.command();
        if !matches!(command, Command::Connect | Command::Stomp)
            && self.sessions.state(session).await == Some(ProtocolState::Unconnected)
        {
            tracing::debug!(%session, %command, "frame received before CONNECT");
        }

        match command {
            Command::Connect | Command::Stomp => self.on_connect(session).await,
            Command::Subscribe => self.on_subscribe(session, frame).await,
            Command::Unsubscribe => self.on_unsubscribe(session, frame).await,
            Command::Send => self.on_send(frame).await,
            Command::Disconnect => self.on_disconnect(session, frame).await,
            other => Err(BrokerError::UnrecognizedCommand(other.to_string())),
        }
    }

    async fn on_connect(&self, session: SessionId) -> Result<(), BrokerError> {
        self.sessions.mark_connected(session).await?;
        let connected = Frame::new(Command::Connected)
            .with_header("version", STOMP_VERSION)
            .with_header("heart-beat", HEART_BEAT);
        self.sessions.send(session, connected.encode()).await?;
        tracing::info!(%session, "sent CONNECTED");
        Ok(())
    }

    async fn on_subscribe(&self, session: SessionId, frame: &Frame) -> Result<(), BrokerError> {
        let destination = frame
            .header("destination")
            .ok_or(BrokerError::missing_destination("SUBSCRIBE"))?;
        let id = frame
            .header("id")
            .ok_or(BrokerError::missing_subscription_id("SUBSCRIBE"))?;

        self.subscriptions.subscribe(session, id, destination).await;
        tracing::info!(%session, %destination, subscription = %id, "client subscribed");

        self.send_receipt(session, frame).await?;
        self.router
            .deliver(session, id, destination, &welcome_body(destination))
            .await
    }

    async fn on_unsubscribe(&self, session: SessionId, frame: &Frame) -> Result<(), BrokerError> {
        let id = frame
            .header("id")
            .ok_or(BrokerError::missing_subscription_id("UNSUBSCRIBE"))?;

        match self.subscriptions.unsubscribe(session, id).await {
            Some(destination) => {
                tracing::info!(%session, %destination, subscription = %id, "client unsubscribed");
            }
            None => tracing::debug!(%session, subscription = %id, "unsubscribe of unknown id"),
        }
        self.send_receipt(session, frame).await
    }

    async fn on_send(&self, frame: &Frame) -> Result<(), BrokerError> {
        let destination = frame
            .header("destination")
            .ok_or(BrokerError::missing_destination("SEND"))?;
        let delivered = self.router.broadcast(destination, frame.body()).await;
        tracing::info!(%destination, delivered, "message published");
        Ok(())
    }

    async fn on_disconnect(&self, session: SessionId, frame: &Frame) -> Result<(), BrokerError> {
        let removed = self.subscriptions.unsubscribe_all(session).await;
        tracing::info!(%session, removed, "client disconnected");
        self.send_receipt(session, frame).await
    }

    /// Sends `RECEIPT` if the frame carries a `receipt` header.
    async fn send_receipt(&self, session: SessionId, frame: &Frame) -> Result<(), BrokerError> {
        let Some(receipt) = frame.header("receipt") else {
            return Ok(());
        };
        let reply = Frame::new(Command::Receipt).with_header("receipt-id", receipt);
        self.sessions.send(session, reply.encode()).await
    }
}

/// JSON body of the greeting sent to each new subscription.
fn welcome_body(destination: &str) -> String {
    serde_json::json!({
        "content": format!("Welcome to {destination}!"),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
    .to_string()
}
