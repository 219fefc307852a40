//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::broker::Broker;
use crate::config::BrokerConfig;
use crate::transport::xhr::XhrSessions;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The broker every transport session talks to.
    pub broker: Arc<Broker>,
    /// Startup configuration.
    pub config: Arc<BrokerConfig>,
    /// SockJS sessions carried over the XHR transports.
    pub xhr_sessions: Arc<XhrSessions>,
}

impl AppState {
    /// Builds state around a fresh broker.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            broker: Arc::new(Broker::new()),
            xhr_sessions: Arc::new(XhrSessions::new(config.sockjs_disconnect_delay)),
            config: Arc::new(config),
        }
    }
}
