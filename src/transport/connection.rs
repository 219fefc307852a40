//! Per-session WebSocket read/write loop.
//!
//! Each accepted WebSocket becomes one broker session. The loop reads
//! transport messages and hands every contained frame to the broker, and
//! drains the session's outbound queue onto the socket. Closing the socket
//! (from either side) closes the session; when the broker closes the queue
//! first, the client is told with a close message before the socket goes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::sockjs::{SockJsFrame, decode_client_payload};
use crate::broker::Broker;
use crate::domain::SessionId;
use crate::error::BrokerError;

/// How STOMP frames are carried inside WebSocket messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One frame per WebSocket text message, no envelope.
    Raw,
    /// SockJS envelope: `o`/`h`/`a[...]`/`c[...]` out, JSON arrays in.
    SockJs,
}

impl Framing {
    /// Message to send right after the upgrade, if any.
    #[must_use]
    pub fn open_message(self) -> Option<String> {
        match self {
            Self::Raw => None,
            Self::SockJs => Some(SockJsFrame::Open.encode()),
        }
    }

    /// Keep-alive message, if this framing has one.
    #[must_use]
    pub fn heartbeat_message(self) -> Option<String> {
        match self {
            Self::Raw => None,
            Self::SockJs => Some(SockJsFrame::Heartbeat.encode()),
        }
    }

    /// Message sent when the broker ends the session.
    #[must_use]
    pub fn close_message(self) -> Message {
        match self {
            Self::Raw => Message::Close(Some(CloseFrame {
                code: close_code::AWAY,
                reason: "server shutting down".into(),
            })),
            Self::SockJs => Message::text(SockJsFrame::go_away().encode()),
        }
    }

    /// Wraps one encoded frame for the wire.
    #[must_use]
    pub fn pack(self, frame: String) -> String {
        match self {
            Self::Raw => frame,
            Self::SockJs => SockJsFrame::Messages(vec![frame]).encode(),
        }
    }

    /// Extracts the frames carried by one inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Transport`] if a SockJS message is not a JSON
    /// string array.
    pub fn unpack(self, text: &str) -> Result<Vec<String>, BrokerError> {
        match self {
            Self::Raw => Ok(vec![text.to_string()]),
            Self::SockJs => decode_client_payload(text),
        }
    }
}

/// Runs the read/write loop for one WebSocket until either side closes.
pub async fn run_connection(
    socket: WebSocket,
    broker: Arc<Broker>,
    framing: Framing,
    heartbeat_every: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let session = broker.open_session(outbound).await;

    if let Some(open) = framing.open_message()
        && ws_tx.send(Message::text(open)).await.is_err()
    {
        broker.close_session(session).await;
        return;
    }

    let mut heartbeat = tokio::time::interval_at(Instant::now() + heartbeat_every, heartbeat_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let heartbeat_message = framing.heartbeat_message();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&broker, session, framing, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => handle_inbound(&broker, session, framing, text).await,
                        Err(_) => tracing::warn!(%session, "dropping non-UTF-8 binary message"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%session, error = %err, "websocket read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Frame queued for this session by the broker
            queued = outbound_rx.recv() => {
                let Some(frame) = queued else {
                    let _ = ws_tx.send(framing.close_message()).await;
                    break;
                };
                if ws_tx.send(Message::text(framing.pack(frame))).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick(), if heartbeat_message.is_some() => {
                if let Some(beat) = heartbeat_message.clone()
                    && ws_tx.send(Message::text(beat)).await.is_err()
                {
                    break;
                }
            }
        }
    }

    broker.close_session(session).await;
    tracing::debug!(%session, "websocket connection closed");
}

/// Hands every frame in one transport message to the broker.
async fn handle_inbound(broker: &Broker, session: SessionId, framing: Framing, text: &str) {
    match framing.unpack(text) {
        Ok(frames) => dispatch_frames(broker, session, frames).await,
        Err(err) => tracing::warn!(%session, error = %err, "dropping transport message"),
    }
}

/// Hands unpacked frames to the broker in order, skipping client
/// heart-beats and logging rejected frames.
pub(crate) async fn dispatch_frames(broker: &Broker, session: SessionId, frames: Vec<String>) {
    for raw in frames {
        if is_heartbeat(&raw) {
            continue;
        }
        if let Err(err) = broker.handle_text(session, &raw).await {
            log_rejected(session, &err);
        }
    }
}

/// A STOMP client heart-beat is a bare end-of-line.
fn is_heartbeat(raw: &str) -> bool {
    raw.chars().all(|c| c == '\n' || c == '\r')
}

fn log_rejected(session: SessionId, err: &BrokerError) {
    match err {
        BrokerError::UnrecognizedCommand(command) => {
            tracing::info!(%session, %command, "unknown command, frame dropped");
        }
        BrokerError::SessionNotFound(_) => {
            tracing::debug!(%session, error = %err, "reply dropped, session gone");
        }
        _ => tracing::warn!(%session, error = %err, "frame rejected"),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn raw_framing_is_transparent() {
        assert_eq!(Framing::Raw.open_message(), None);
        assert_eq!(Framing::Raw.heartbeat_message(), None);
        assert_eq!(Framing::Raw.pack("SEND\n\n\0".to_string()), "SEND\n\n\0");
        assert_eq!(
            Framing::Raw.unpack("SEND\n\n\0"),
            Ok(vec!["SEND\n\n\0".to_string()])
        );
    }

    #[test]
    fn sockjs_framing_packs_and_unpacks() {
        assert_eq!(Framing::SockJs.open_message().as_deref(), Some("o"));
        assert_eq!(Framing::SockJs.heartbeat_message().as_deref(), Some("h"));
        assert_eq!(
            Framing::SockJs.pack("X\n\n\0".to_string()),
            r#"a["X\n\n\u0000"]"#
        );
        assert_eq!(
            Framing::SockJs.unpack(r#"["X\n\n\u0000"]"#),
            Ok(vec!["X\n\n\0".to_string()])
        );
    }

    #[test]
    fn close_message_matches_framing() {
        assert_eq!(
            Framing::SockJs.close_message(),
            Message::text(r#"c[3000,"Go away!"]"#)
        );
        let Message::Close(Some(frame)) = Framing::Raw.close_message() else {
            panic!("raw framing should close the socket");
        };
        assert_eq!(frame.code, close_code::AWAY);
    }

    #[test]
    fn end_of_line_only_messages_are_heartbeats() {
        assert!(is_heartbeat("\n"));
        assert!(is_heartbeat("\r\n"));
        assert!(is_heartbeat(""));
        assert!(!is_heartbeat("CONNECT\n\n\0"));
    }
}
