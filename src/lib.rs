//! # stomp-relay
//!
//! A minimal STOMP publish/subscribe broker for browser clients.
//!
//! Clients connect over a WebSocket (plain, or wrapped in SockJS framing)
//! or over the SockJS XHR fallbacks, subscribe to destinations and publish messages; the broker fans every
//! published message out to all subscribers of its destination. Delivery
//! is at-most-once and in-memory only.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket / SockJS / XHR)
//!     │
//!     ├── Transport (transport/)      framing, per-session read/write loop,
//!     │                               XHR session store
//!     │
//!     ├── Broker (broker/)            dispatcher + broadcast router
//!     │
//!     ├── SessionRegistry (domain/)
//!     ├── SubscriptionTable (domain/)
//!     │
//!     └── Frame codec (stomp/)
//! ```

pub mod api;
pub mod app_state;
pub mod broker;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod stomp;
pub mod transport;
