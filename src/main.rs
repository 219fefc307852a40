//! stomp-relay server entry point.
//!
//! Starts the Axum HTTP server with the STOMP transport, API and static
//! asset routes.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use stomp_relay::app_state::AppState;
use stomp_relay::broker::Broker;
use stomp_relay::config::BrokerConfig;
use stomp_relay::server::build_app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; LOG_FORMAT=json switches to structured output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = BrokerConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting stomp-relay");

    let listen_addr = config.listen_addr;
    let prefix = config.sockjs_prefix.clone();
    let state = AppState::new(config);
    let broker = Arc::clone(&state.broker);
    let app = build_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, endpoint = %prefix, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(broker))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C after closing every broker session, so connected
/// clients are told the server is going away.
async fn shutdown_signal(broker: Arc<Broker>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    let closed = broker.shutdown().await;
    tracing::info!(sessions = closed, "shutting down");
}
