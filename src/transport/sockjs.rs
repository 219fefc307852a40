//! SockJS framing.
//!
//! Every server message starts with a one-letter type:
//!
//! | Frame        | Meaning                                   |
//! |--------------|-------------------------------------------|
//! | `o`          | session open                              |
//! | `h`          | heartbeat                                 |
//! | `a[...]`     | JSON array of application messages        |
//! | `c[code,""]` | session closed by the server              |
//!
//! On the WebSocket transport each frame is one text message; the HTTP
//! transports terminate each frame with `\n`. The client sends a JSON array
//! of strings (older clients send a single JSON string). Each string is one
//! STOMP frame.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::BrokerError;

/// Close code sent when the server ends a session.
pub const CLOSE_GO_AWAY: u16 = 3000;

/// Close code sent to a second receiving request on a busy HTTP session.
pub const CLOSE_ANOTHER_CONNECTION: u16 = 2010;

/// Body of `GET {prefix}`.
pub const GREETING: &str = "Welcome to SockJS!\n";

/// One server → client SockJS frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockJsFrame {
    /// Session opened.
    Open,
    /// Keep-alive.
    Heartbeat,
    /// Application messages.
    Messages(Vec<String>),
    /// Session closed by the server.
    Close {
        /// SockJS close code.
        code: u16,
        /// Human-readable reason.
        reason: String,
    },
}

impl SockJsFrame {
    /// `c[3000,"Go away!"]`, sent when the server closes the session.
    #[must_use]
    pub fn go_away() -> Self {
        Self::Close {
            code: CLOSE_GO_AWAY,
            reason: "Go away!".to_string(),
        }
    }

    /// `c[2010,"Another connection still open"]`.
    #[must_use]
    pub fn another_connection_open() -> Self {
        Self::Close {
            code: CLOSE_ANOTHER_CONNECTION,
            reason: "Another connection still open".to_string(),
        }
    }

    /// Serializes the frame to its text form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open => "o".to_string(),
            Self::Heartbeat => "h".to_string(),
            Self::Messages(messages) => {
                format!("a{}", serde_json::to_string(messages).unwrap_or_default())
            }
            Self::Close { code, reason } => format!("c{}", serde_json::json!([code, reason])),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClientPayload {
    Batch(Vec<String>),
    Single(String),
}

/// Unpacks a client → server SockJS message into its application messages.
///
/// An empty message carries nothing and yields an empty vector.
///
/// # Errors
///
/// Returns [`BrokerError::Transport`] if the text is neither a JSON array of
/// strings nor a JSON string.
pub fn decode_client_payload(text: &str) -> Result<Vec<String>, BrokerError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<ClientPayload>(text) {
        Ok(ClientPayload::Batch(messages)) => Ok(messages),
        Ok(ClientPayload::Single(message)) => Ok(vec![message]),
        Err(err) => Err(BrokerError::Transport(format!(
            "invalid SockJS payload: {err}"
        ))),
    }
}

/// Body of `GET {prefix}/info`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SockJsInfo {
    /// Whether the WebSocket transport is available.
    pub websocket: bool,
    /// Allowed origins, `*:*` for any.
    pub origins: Vec<String>,
    /// Whether load balancers need a `JSESSIONID` cookie.
    pub cookie_needed: bool,
    /// Random value clients mix into their session ids.
    pub entropy: u32,
}

impl SockJsInfo {
    /// Info for this server: WebSocket enabled (the XHR transports are
    /// always on), any origin, fresh entropy.
    #[must_use]
    pub fn current() -> Self {
        // Top 32 bits of a v4 UUID are fully random.
        let entropy = (uuid::Uuid::new_v4().as_u128() >> 96) as u32;
        Self {
            websocket: true,
            origins: vec!["*:*".to_string()],
            cookie_needed: false,
            entropy,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn control_frames_encode_to_single_letters() {
        assert_eq!(SockJsFrame::Open.encode(), "o");
        assert_eq!(SockJsFrame::Heartbeat.encode(), "h");
    }

    #[test]
    fn messages_are_json_escaped() {
        let frame = SockJsFrame::Messages(vec!["CONNECTED\nversion:1.2\n\n\0".to_string()]);
        assert_eq!(frame.encode(), r#"a["CONNECTED\nversion:1.2\n\n\u0000"]"#);
    }

    #[test]
    fn close_frame_carries_code_and_reason() {
        assert_eq!(SockJsFrame::go_away().encode(), r#"c[3000,"Go away!"]"#);
        assert_eq!(
            SockJsFrame::another_connection_open().encode(),
            r#"c[2010,"Another connection still open"]"#
        );
    }

    #[test]
    fn client_batch_is_unpacked() {
        let Ok(messages) = decode_client_payload(r#"["CONNECT\n\n\u0000","SEND\n\n\u0000"]"#)
        else {
            panic!("batch should decode");
        };
        assert_eq!(messages, vec!["CONNECT\n\n\0", "SEND\n\n\0"]);
    }

    #[test]
    fn single_string_payload_is_accepted() {
        assert_eq!(
            decode_client_payload(r#""DISCONNECT\n\n\u0000""#),
            Ok(vec!["DISCONNECT\n\n\0".to_string()])
        );
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert_eq!(decode_client_payload(""), Ok(Vec::new()));
    }

    #[test]
    fn non_string_payload_is_rejected() {
        assert!(matches!(
            decode_client_payload("{\"a\":1}"),
            Err(BrokerError::Transport(_))
        ));
        assert!(matches!(
            decode_client_payload("CONNECT\n\n\0"),
            Err(BrokerError::Transport(_))
        ));
    }

    #[test]
    fn info_allows_any_origin_over_websocket() {
        let info = SockJsInfo::current();
        assert!(info.websocket);
        assert!(!info.cookie_needed);
        assert_eq!(info.origins, vec!["*:*"]);
    }
}
