//! STOMP command tokens.

use std::fmt;

/// The first line of a frame.
///
/// Unknown tokens are kept verbatim in [`Command::Other`] so that a frame
/// carrying one still decodes; the dispatcher decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client → server session opening.
    Connect,
    /// STOMP 1.2 alias of `CONNECT`.
    Stomp,
    /// Server → client reply to `CONNECT`.
    Connected,
    /// Client → server subscription request.
    Subscribe,
    /// Client → server removal of one subscription.
    Unsubscribe,
    /// Client → server publish.
    Send,
    /// Server → client delivery.
    Message,
    /// Server → client acknowledgement of a `receipt` header.
    Receipt,
    /// Client → server graceful close.
    Disconnect,
    /// Any token not listed above.
    Other(String),
}

impl Command {
    /// Returns the wire token for this command.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Disconnect => "DISCONNECT",
            Self::Other(token) => token,
        }
    }
}

impl From<&str> for Command {
    fn from(token: &str) -> Self {
        match token {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "SEND" => Self::Send,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "DISCONNECT" => Self::Disconnect,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_map_to_variants() {
        assert_eq!(Command::from("SEND"), Command::Send);
        assert_eq!(Command::from("STOMP"), Command::Stomp);
        assert_eq!(Command::from("DISCONNECT").as_str(), "DISCONNECT");
    }

    #[test]
    fn tokens_are_case_sensitive() {
        assert_eq!(Command::from("send"), Command::Other("send".to_string()));
    }

    #[test]
    fn unknown_token_is_kept_verbatim() {
        let cmd = Command::from("NACK");
        assert_eq!(cmd.to_string(), "NACK");
    }
}
