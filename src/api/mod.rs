//! HTTP API: system endpoints and the OpenAPI document.

pub mod system;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::config::DEFAULT_SOCKJS_PREFIX;

/// OpenAPI description of the HTTP endpoints.
///
/// Transport paths are declared under [`DEFAULT_SOCKJS_PREFIX`]; use
/// [`openapi_for`] to get them under the configured prefix.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "stomp-relay", description = "STOMP broker over WebSocket and SockJS"),
    paths(
        system::status_handler,
        system::health_handler,
        crate::transport::handler::info_handler,
    ),
    tags(
        (name = "System", description = "Liveness and health"),
        (name = "Transport", description = "SockJS transport discovery"),
    )
)]
pub struct ApiDoc;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// The OpenAPI document with transport paths moved under `prefix`.
#[must_use]
pub fn openapi_for(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.paths.paths = std::mem::take(&mut doc.paths.paths)
        .into_iter()
        .map(|(path, item)| match path.strip_prefix(DEFAULT_SOCKJS_PREFIX) {
            Some(rest) => (format!("{prefix}{rest}"), item),
            None => (path, item),
        })
        .collect();
    doc
}

/// Builds the HTTP API router, including the OpenAPI document (and Swagger
/// UI when the `swagger-ui` feature is enabled) for transport endpoints
/// mounted under `prefix`.
pub fn build_router(prefix: &str) -> Router<AppState> {
    let doc = openapi_for(prefix);
    let router = Router::new().merge(system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, doc),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        OPENAPI_PATH,
        axum::routing::get(move || async move { axum::Json(doc) }),
    );

    router
}
