//! Transport layer: WebSocket endpoints with optional SockJS framing, and
//! the SockJS HTTP fallbacks.
//!
//! Endpoints are mounted under the configured prefix (default
//! `/ws-endpoint`):
//!
//! - `GET /info` — SockJS info document
//! - `GET /websocket` — raw WebSocket
//! - `GET /{server_id}/{session_id}/websocket` — SockJS WebSocket
//! - `POST /{server_id}/{session_id}/xhr` — SockJS XHR polling
//! - `POST /{server_id}/{session_id}/xhr_streaming` — SockJS XHR streaming
//! - `POST /{server_id}/{session_id}/xhr_send` — SockJS XHR client frames
//!
//! The greeting at the prefix itself is routed by [`crate::server`].

pub mod connection;
pub mod handler;
pub mod sockjs;
pub mod xhr;

use axum::Router;
use axum::routing::{get, post};

use crate::app_state::AppState;

/// Transport routes, to be nested under the configured prefix.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/info", get(handler::info_handler))
        .route("/websocket", get(handler::raw_ws_handler))
        .route(
            "/{server_id}/{session_id}/websocket",
            get(handler::sockjs_ws_handler),
        )
        .route("/{server_id}/{session_id}/xhr", post(xhr::xhr_poll_handler))
        .route(
            "/{server_id}/{session_id}/xhr_streaming",
            post(xhr::xhr_streaming_handler),
        )
        .route(
            "/{server_id}/{session_id}/xhr_send",
            post(xhr::xhr_send_handler),
        )
}
