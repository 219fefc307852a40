//! STOMP frame model and text codec.
//!
//! A [`Frame`] is decoded from, and encoded to, the text of exactly one
//! transport message. The codec is deliberately small: it understands
//! the command line, `key:value` headers and a NUL-terminated body, and
//! nothing else (no content-length, no header escaping).

pub mod command;
pub mod frame;
pub mod headers;

pub use command::Command;
pub use frame::Frame;
pub use headers::Headers;
