//! HTTP application assembly.

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::transport;

/// Builds the full application router: HTTP API, STOMP transport under the
/// configured prefix, and static assets for every other path.
///
/// CORS mirrors the request origin and allows credentials, which the SockJS
/// XHR transports need when the page is served from another origin.
pub fn build_app(state: AppState) -> Router {
    let prefix = state.config.sockjs_prefix.clone();
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .merge(api::build_router(&prefix))
        .route(&prefix, get(transport::xhr::greeting_handler))
        .route(&format!("{prefix}/"), get(transport::xhr::greeting_handler))
        .nest(&prefix, transport::routes())
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
