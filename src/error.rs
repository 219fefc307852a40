//! Broker error types.
//!
//! [`BrokerError`] covers every failure the broker can detect while
//! handling a session's traffic. None of them is fatal: the session
//! boundary logs the error and drops the offending message, and the
//! session (and every other session) keeps running.

use crate::domain::SessionId;

/// Frame-level and routing errors.
///
/// | Variant               | Detected by          | Effect                     |
/// |-----------------------|----------------------|----------------------------|
/// | `MalformedFrame`      | frame codec          | frame discarded            |
/// | `UnrecognizedCommand` | dispatcher           | frame discarded, no reply  |
/// | `MissingHeader`       | dispatcher           | operation skipped          |
/// | `SessionNotFound`     | session registry     | recipient skipped          |
/// | `Transport`           | SockJS framing       | transport message dropped  |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// The input did not contain a command line.
    #[error("malformed frame: missing command line")]
    MalformedFrame,

    /// The frame decoded but no handler exists for its command.
    #[error("unrecognized command: {0}")]
    UnrecognizedCommand(String),

    /// A required header was absent.
    #[error("{command} frame is missing the `{header}` header")]
    MissingHeader {
        /// Command of the offending frame.
        command: &'static str,
        /// Name of the absent header.
        header: &'static str,
    },

    /// No live session is registered under the given id.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// A transport message could not be unwrapped into frames.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BrokerError {
    /// Shorthand for a missing `destination` header.
    #[must_use]
    pub const fn missing_destination(command: &'static str) -> Self {
        Self::MissingHeader {
            command,
            header: "destination",
        }
    }

    /// Shorthand for a missing `id` header.
    #[must_use]
    pub const fn missing_subscription_id(command: &'static str) -> Self {
        Self::MissingHeader {
            command,
            header: "id",
        }
    }
}
