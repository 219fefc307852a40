//! Broker configuration loaded from environment variables.
//!
//! All settings come from the environment (or a `.env` file via
//! `dotenvy`). Only the port is expected to vary between deployments;
//! the rest have fixed defaults that match the browser client.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default URL prefix of the STOMP transport endpoints.
pub const DEFAULT_SOCKJS_PREFIX: &str = "/ws-endpoint";

/// Top-level broker configuration.
///
/// Loaded once at startup via [`BrokerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// URL prefix under which the SockJS/WebSocket endpoints are mounted.
    /// Always starts with `/` and never ends with one.
    pub sockjs_prefix: String,

    /// Directory served as static assets for unmatched paths.
    pub static_dir: PathBuf,

    /// Interval between SockJS `h` frames on idle sessions. Also bounds
    /// how long an XHR polling request waits for messages.
    pub sockjs_heartbeat: Duration,

    /// How long an XHR session survives with no receiving request before
    /// the broker closes it.
    pub sockjs_disconnect_delay: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            sockjs_prefix: DEFAULT_SOCKJS_PREFIX.to_string(),
            static_dir: PathBuf::from("public"),
            sockjs_heartbeat: Duration::from_secs(25),
            sockjs_disconnect_delay: Duration::from_secs(5),
        }
    }
}

impl BrokerConfig {
    /// Loads configuration from environment variables.
    ///
    /// | Variable                       | Default        |
    /// |--------------------------------|----------------|
    /// | `PORT`                         | `8080`         |
    /// | `LISTEN_HOST`                  | `0.0.0.0`      |
    /// | `SOCKJS_PREFIX`                | `/ws-endpoint` |
    /// | `STATIC_DIR`                   | `public`       |
    /// | `SOCKJS_HEARTBEAT_SECS`        | `25`           |
    /// | `SOCKJS_DISCONNECT_DELAY_SECS` | `5`            |
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    /// Unparsable numbers fall back to their default.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_HOST` is set but is not an IP address.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let host: IpAddr = match std::env::var("LISTEN_HOST") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr.ip(),
        };
        let port = parse_env("PORT", DEFAULT_PORT);

        let sockjs_prefix = std::env::var("SOCKJS_PREFIX")
            .map(|raw| normalize_prefix(&raw))
            .unwrap_or(defaults.sockjs_prefix);

        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let heartbeat_secs: u64 = parse_env("SOCKJS_HEARTBEAT_SECS", 25);
        let disconnect_secs: u64 = parse_env("SOCKJS_DISCONNECT_DELAY_SECS", 5);

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            sockjs_prefix,
            static_dir,
            sockjs_heartbeat: Duration::from_secs(heartbeat_secs.max(1)),
            sockjs_disconnect_delay: Duration::from_secs(disconnect_secs.max(1)),
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Forces a leading `/` and strips trailing ones. A prefix that reduces to
/// nothing falls back to [`DEFAULT_SOCKJS_PREFIX`], since the endpoints
/// cannot be nested at the root.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_SOCKJS_PREFIX.to_string()
    } else {
        format!("/{trimmed}")
    }
}
