//! Axum handlers for the STOMP transport endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::connection::{Framing, run_connection};
use super::sockjs::SockJsInfo;
use crate::app_state::AppState;

/// WebSocket sub-protocols offered by STOMP browser clients.
pub const STOMP_SUBPROTOCOLS: [&str; 3] = ["v12.stomp", "v11.stomp", "v10.stomp"];

/// `GET {prefix}/info` — SockJS server capabilities.
///
/// Documented under the default prefix; [`crate::api::openapi_for`]
/// rewrites it to the configured one.
#[utoipa::path(
    get,
    path = "/ws-endpoint/info",
    tag = "Transport",
    summary = "SockJS info",
    description = "Reports the transports this server offers: WebSocket plus the XHR streaming and polling fallbacks.",
    responses(
        (status = 200, description = "Server capabilities", body = SockJsInfo),
    )
)]
pub async fn info_handler() -> impl IntoResponse {
    Json(SockJsInfo::current())
}

/// `GET {prefix}/websocket` — plain WebSocket, one STOMP frame per message.
pub async fn raw_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let broker = Arc::clone(&state.broker);
    let heartbeat = state.config.sockjs_heartbeat;

    ws.protocols(STOMP_SUBPROTOCOLS)
        .on_upgrade(move |socket| run_connection(socket, broker, Framing::Raw, heartbeat))
}

/// `GET {prefix}/{server_id}/{session_id}/websocket` — SockJS WebSocket
/// transport.
///
/// The path ids are chosen by the client and only logged; the broker
/// assigns its own session id.
pub async fn sockjs_ws_handler(
    ws: WebSocketUpgrade,
    Path((server_id, sockjs_session)): Path<(String, String)>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    tracing::debug!(%server_id, %sockjs_session, "sockjs websocket upgrade");
    let broker = Arc::clone(&state.broker);
    let heartbeat = state.config.sockjs_heartbeat;

    ws.on_upgrade(move |socket| run_connection(socket, broker, Framing::SockJs, heartbeat))
}
