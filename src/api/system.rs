//! System endpoints: status check and health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Liveness check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Always `"Server is running"`.
    pub status: String,
    /// Server time, RFC 3339 with millisecond precision.
    pub timestamp: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: String,
    /// Server time, RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Live STOMP sessions.
    pub sessions: usize,
    /// Subscriptions across all sessions.
    pub subscriptions: usize,
}

/// `GET /api/test` — Liveness check used by the browser client.
#[utoipa::path(
    get,
    path = "/api/test",
    tag = "System",
    summary = "Liveness check",
    description = "Returns a fixed status string and the current server time.",
    responses(
        (status = 200, description = "Server is running", body = StatusResponse),
    )
)]
pub async fn status_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: "Server is running".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )
}

/// `GET /health` — Service health and broker counters.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, and the number of live sessions and subscriptions.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            sessions: state.broker.session_count().await,
            subscriptions: state.broker.subscription_count().await,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test", get(status_handler))
        .route("/health", get(health_handler))
}
