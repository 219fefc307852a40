//! Broker state: session identity, session registry, subscription table.
//!
//! Both tables are plain owned values with their own lock. The
//! [`crate::broker::Broker`] holds them and hands references to the
//! dispatcher and router, so tests can build isolated instances.

pub mod message_id;
pub mod session_id;
pub mod session_registry;
pub mod subscription_table;

pub use message_id::MessageIdGenerator;
pub use session_id::SessionId;
pub use session_registry::{Outbound, ProtocolState, SessionHandle, SessionRegistry};
pub use subscription_table::SubscriptionTable;
