//! Frame value type and its text codec.
//!
//! Wire form of a frame:
//!
//! ```text
//! COMMAND\n
//! key:value\n        (zero or more)
//! \n
//! body               (may be empty)
//! \0
//! ```
//!
//! Header values are written and read verbatim: no STOMP 1.2 escaping is
//! applied, so a value containing a line break cannot be represented.

use super::{Command, Headers};
use crate::error::BrokerError;

/// Frame terminator byte.
pub const NUL: char = '\0';

/// One protocol message: command, headers, body.
///
/// Frames are built once and never mutated afterwards; the builder methods
/// consume and return `self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    headers: Headers,
    body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    /// Adds a header, replacing any earlier value for the same key.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The frame command.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// All headers in stored order.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Shorthand for `self.headers().get(key)`.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// The body, empty when the frame carries none.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses one complete frame.
    ///
    /// Header parsing stops at the first empty line. Lines without a colon,
    /// or starting with one, are ignored. The body runs from after that
    /// empty line up to the trailing NUL; end-of-line characters after the
    /// NUL are tolerated. Unknown commands decode into [`Command::Other`].
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MalformedFrame`] if the command line is empty.
    pub fn decode(raw: &str) -> Result<Self, BrokerError> {
        let Some((command_line, mut rest)) = raw.split_once('\n') else {
            // No line break at all: a bare command, possibly NUL-terminated.
            let token = trim_cr(raw.trim_end_matches(NUL));
            return if token.is_empty() {
                Err(BrokerError::MalformedFrame)
            } else {
                Ok(Self::new(Command::from(token)))
            };
        };

        let token = trim_cr(command_line);
        if token.is_empty() {
            return Err(BrokerError::MalformedFrame);
        }

        let mut headers = Headers::new();
        let body_region = loop {
            match rest.split_once('\n') {
                Some((line, tail)) => {
                    let line = trim_cr(line);
                    if line.is_empty() {
                        break tail;
                    }
                    parse_header_line(line, &mut headers);
                    rest = tail;
                }
                None => {
                    // Header block ran into the terminator without a blank line.
                    parse_header_line(trim_cr(strip_terminator(rest)), &mut headers);
                    break "";
                }
            }
        };

        Ok(Self {
            command: Command::from(token),
            headers,
            body: strip_terminator(body_region).to_string(),
        })
    }

    /// Serializes the frame to its wire form, headers in stored order.
    #[must_use]
    pub fn encode(&self) -> String {
        let headers_len: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum();
        let mut out =
            String::with_capacity(self.command.as_str().len() + headers_len + self.body.len() + 3);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in self.headers.iter() {
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }
}

fn parse_header_line(line: &str, headers: &mut Headers) {
    if let Some((key, value)) = line.split_once(':')
        && !key.is_empty()
    {
        headers.insert(key, value);
    }
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn strip_terminator(region: &str) -> &str {
    region
        .trim_end_matches(['\r', '\n'])
        .strip_suffix(NUL)
        .unwrap_or(region)
}
