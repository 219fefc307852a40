//! SockJS HTTP fallback transports: `xhr`, `xhr_streaming`, `xhr_send`.
//!
//! Browsers that cannot open a WebSocket talk to the broker over plain
//! HTTP requests that share a SockJS session id taken from the URL. Each
//! such id owns one broker session and one outbound queue:
//!
//! ```text
//! POST {prefix}/{server}/{session}/xhr            ─┐
//! POST {prefix}/{server}/{session}/xhr_streaming  ─┴─► drain outbound queue
//! POST {prefix}/{server}/{session}/xhr_send       ───► Broker::handle_text
//! ```
//!
//! At most one receiving request may hold the queue at a time. A session
//! with no receiving request for longer than the disconnect delay is
//! closed by its reaper task.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, mpsc};
use tokio::time::{Instant, MissedTickBehavior};

use super::connection::dispatch_frames;
use super::sockjs::{GREETING, SockJsFrame, decode_client_payload};
use crate::app_state::AppState;
use crate::broker::Broker;
use crate::domain::SessionId;

/// Content type of every receiving response.
pub const JAVASCRIPT_CONTENT_TYPE: &str = "application/javascript; charset=UTF-8";

/// A streaming response is ended once it has carried this many bytes; the
/// client then opens a new one on the same session.
pub const STREAMING_RESPONSE_LIMIT: usize = 128 * 1024;

/// Sent ahead of the first frame on `xhr_streaming` so that browsers start
/// handing chunks to the page.
const STREAMING_PRELUDE_LEN: usize = 2048;

type OutboundQueue = mpsc::UnboundedReceiver<String>;

/// One SockJS session carried over HTTP requests.
#[derive(Debug)]
pub struct XhrSession {
    broker_session: SessionId,
    outbound: Arc<Mutex<OutboundQueue>>,
    last_seen: Mutex<Instant>,
}

impl XhrSession {
    /// Broker session this SockJS session feeds.
    #[must_use]
    pub const fn broker_session(&self) -> SessionId {
        self.broker_session
    }

    /// Claims the outbound queue for one receiving request, or `None` if
    /// another request holds it.
    fn claim(&self) -> Option<OwnedMutexGuard<OutboundQueue>> {
        Arc::clone(&self.outbound).try_lock_owned().ok()
    }

    async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    /// No request is receiving and none has for at least `delay`.
    async fn is_abandoned(&self, delay: Duration) -> bool {
        let receiving = self.outbound.try_lock().is_err();
        !receiving && self.last_seen.lock().await.elapsed() >= delay
    }
}

/// SockJS HTTP sessions keyed by the session id from the URL.
#[derive(Debug)]
pub struct XhrSessions {
    sessions: RwLock<HashMap<String, Arc<XhrSession>>>,
    disconnect_delay: Duration,
}

impl XhrSessions {
    /// Creates an empty store whose sessions close after `disconnect_delay`
    /// without a receiving request.
    #[must_use]
    pub fn new(disconnect_delay: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            disconnect_delay,
        }
    }

    /// Returns the session under `id`, if any.
    pub async fn get(&self, id: &str) -> Option<Arc<XhrSession>> {
        self.sessions.read().await.get(id).map(Arc::clone)
    }

    /// Returns the session under `id`, opening a broker session for it if
    /// none exists. The flag is `true` when the session was just opened.
    pub async fn get_or_open(
        self: &Arc<Self>,
        id: &str,
        broker: &Arc<Broker>,
    ) -> (Arc<XhrSession>, bool) {
        let mut map = self.sessions.write().await;
        if let Some(existing) = map.get(id) {
            return (Arc::clone(existing), false);
        }

        let (outbound, queue) = mpsc::unbounded_channel();
        let broker_session = broker.open_session(outbound).await;
        let session = Arc::new(XhrSession {
            broker_session,
            outbound: Arc::new(Mutex::new(queue)),
            last_seen: Mutex::new(Instant::now()),
        });
        map.insert(id.to_string(), Arc::clone(&session));
        drop(map);

        tracing::debug!(sockjs_session = %id, session = %broker_session, "xhr session opened");
        tokio::spawn(reap_when_abandoned(
            Arc::clone(self),
            Arc::clone(broker),
            id.to_string(),
            Arc::clone(&session),
        ));
        (session, true)
    }

    /// Removes `id` only if it still maps to `session`.
    async fn remove(&self, id: &str, session: &Arc<XhrSession>) -> bool {
        let mut map = self.sessions.write().await;
        if map.get(id).is_some_and(|current| Arc::ptr_eq(current, session)) {
            map.remove(id);
            true
        } else {
            false
        }
    }

    /// Number of open SockJS HTTP sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no SockJS HTTP session is open.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Closes the broker session once nobody has received on it for the
/// disconnect delay, or once it has been removed from the store.
async fn reap_when_abandoned(
    store: Arc<XhrSessions>,
    broker: Arc<Broker>,
    id: String,
    session: Arc<XhrSession>,
) {
    let delay = store.disconnect_delay;
    let mut ticker = tokio::time::interval_at(Instant::now() + delay, delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let still_listed = store
            .get(&id)
            .await
            .is_some_and(|current| Arc::ptr_eq(&current, &session));
        if !still_listed || session.is_abandoned(delay).await {
            break;
        }
    }

    store.remove(&id, &session).await;
    broker.close_session(session.broker_session).await;
    tracing::debug!(sockjs_session = %id, "xhr session closed");
}

fn javascript(body: String) -> Response {
    ([(header::CONTENT_TYPE, JAVASCRIPT_CONTENT_TYPE)], body).into_response()
}

/// One SockJS frame as a line of an HTTP response.
fn line(frame: &SockJsFrame) -> String {
    let mut out = frame.encode();
    out.push('\n');
    out
}

/// Takes `first` plus everything else already queued.
fn batch(first: String, queue: &mut OutboundQueue) -> SockJsFrame {
    let mut messages = vec![first];
    while let Ok(more) = queue.try_recv() {
        messages.push(more);
    }
    SockJsFrame::Messages(messages)
}

/// `GET {prefix}` — SockJS greeting.
pub async fn greeting_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
        GREETING,
    )
}

/// `POST {prefix}/{server_id}/{session_id}/xhr` — long-polling receive.
///
/// The first request on a session id opens it and answers `o`. Later
/// requests wait up to one heartbeat interval for queued frames and answer
/// with `a[...]`, or `h` when nothing arrived.
pub async fn xhr_poll_handler(
    Path((_server_id, sockjs_session)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let (session, opened) = state
        .xhr_sessions
        .get_or_open(&sockjs_session, &state.broker)
        .await;
    if opened {
        return javascript(line(&SockJsFrame::Open));
    }
    let Some(mut queue) = session.claim() else {
        return javascript(line(&SockJsFrame::another_connection_open()));
    };

    session.touch().await;
    let frame = match tokio::time::timeout(state.config.sockjs_heartbeat, queue.recv()).await {
        Ok(Some(first)) => batch(first, &mut queue),
        Ok(None) => {
            state.xhr_sessions.remove(&sockjs_session, &session).await;
            SockJsFrame::go_away()
        }
        Err(_) => SockJsFrame::Heartbeat,
    };
    session.touch().await;
    javascript(line(&frame))
}

struct Streaming {
    queue: OwnedMutexGuard<OutboundQueue>,
    session: Arc<XhrSession>,
    pending: VecDeque<String>,
    heartbeat: Duration,
    sent: usize,
    closed: bool,
}

impl Streaming {
    async fn next_chunk(mut self) -> Option<(Result<String, std::convert::Infallible>, Self)> {
        if let Some(chunk) = self.pending.pop_front() {
            self.sent += chunk.len();
            return Some((Ok(chunk), self));
        }
        if self.closed || self.sent >= STREAMING_RESPONSE_LIMIT {
            return None;
        }

        let frame = match tokio::time::timeout(self.heartbeat, self.queue.recv()).await {
            Ok(Some(first)) => batch(first, &mut self.queue),
            Ok(None) => {
                self.closed = true;
                SockJsFrame::go_away()
            }
            Err(_) => SockJsFrame::Heartbeat,
        };
        self.session.touch().await;
        let chunk = line(&frame);
        self.sent += chunk.len();
        Some((Ok(chunk), self))
    }
}

/// `POST {prefix}/{server_id}/{session_id}/xhr_streaming` — streaming
/// receive.
///
/// Opens the session if needed, then keeps the response open and writes
/// one line per SockJS frame until [`STREAMING_RESPONSE_LIMIT`] bytes have
/// been sent or the session closes.
pub async fn xhr_streaming_handler(
    Path((_server_id, sockjs_session)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let (session, opened) = state
        .xhr_sessions
        .get_or_open(&sockjs_session, &state.broker)
        .await;
    let Some(queue) = session.claim() else {
        return javascript(line(&SockJsFrame::another_connection_open()));
    };
    session.touch().await;

    let mut prelude = "h".repeat(STREAMING_PRELUDE_LEN);
    prelude.push('\n');
    let mut pending = VecDeque::from([prelude]);
    if opened {
        pending.push_back(line(&SockJsFrame::Open));
    }

    let streaming = Streaming {
        queue,
        session,
        pending,
        heartbeat: state.config.sockjs_heartbeat,
        sent: 0,
        closed: false,
    };
    let body = Body::from_stream(stream::unfold(streaming, Streaming::next_chunk));
    ([(header::CONTENT_TYPE, JAVASCRIPT_CONTENT_TYPE)], body).into_response()
}

/// `POST {prefix}/{server_id}/{session_id}/xhr_send` — client → server
/// frames as a JSON array of strings.
///
/// Answers `204` once every frame has been handed to the broker, `404` for
/// an unknown session and `500` for an empty or undecodable body.
pub async fn xhr_send_handler(
    Path((_server_id, sockjs_session)): Path<(String, String)>,
    State(state): State<AppState>,
    body: String,
) -> Response {
    let Some(session) = state.xhr_sessions.get(&sockjs_session).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if body.trim().is_empty() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Payload expected.").into_response();
    }

    let frames = match decode_client_payload(&body) {
        Ok(frames) => frames,
        Err(err) => {
            tracing::warn!(sockjs_session = %sockjs_session, error = %err, "dropping xhr_send payload");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Broken JSON encoding.").into_response();
        }
    };

    dispatch_frames(&state.broker, session.broker_session(), frames).await;
    (
        StatusCode::NO_CONTENT,
        [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
    )
        .into_response()
}
