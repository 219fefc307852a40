//! Live session storage.
//!
//! [`SessionRegistry`] maps each [`SessionId`] to the outbound queue of its
//! transport connection plus the session's protocol state. Sends are
//! non-blocking pushes onto that queue; the connection's writer loop drains
//! it at whatever pace the client allows.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use super::SessionId;
use crate::error::BrokerError;

/// Sending half of a session's outbound queue. Items are encoded frames.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Protocol state of a session.
///
/// Tracked for diagnostics only: the dispatcher processes any frame in
/// either state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolState {
    /// Transport open, no CONNECT seen yet.
    #[default]
    Unconnected,
    /// A CONNECT (or STOMP) frame has been answered.
    Connected,
}

/// Transport handle and state of one registered session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    outbound: Outbound,
    state: ProtocolState,
}

impl SessionHandle {
    /// Wraps an outbound queue in a fresh, unconnected handle.
    #[must_use]
    pub fn new(outbound: Outbound) -> Self {
        Self {
            outbound,
            state: ProtocolState::Unconnected,
        }
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> ProtocolState {
        self.state
    }

    /// Queues `payload` for delivery. Returns `false` if the connection's
    /// writer has already gone away.
    pub fn send(&self, payload: String) -> bool {
        self.outbound.send(payload).is_ok()
    }
}

/// Registry of live sessions, guarded by a single [`RwLock`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session, replacing any previous handle under `id`.
    pub async fn register(&self, id: SessionId, outbound: Outbound) {
        self.sessions
            .write()
            .await
            .insert(id, SessionHandle::new(outbound));
    }

    /// Returns a copy of the session's handle.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionNotFound`] if `id` is not registered.
    pub async fn lookup(&self, id: SessionId) -> Result<SessionHandle, BrokerError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(BrokerError::SessionNotFound(id))
    }

    /// Queues an encoded frame for the session without waiting for it to
    /// be written.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionNotFound`] if `id` is not registered
    /// or its connection has already stopped reading its queue.
    pub async fn send(&self, id: SessionId, payload: String) -> Result<(), BrokerError> {
        let map = self.sessions.read().await;
        let delivered = map.get(&id).is_some_and(|handle| handle.send(payload));
        if delivered {
            Ok(())
        } else {
            Err(BrokerError::SessionNotFound(id))
        }
    }

    /// Moves the session to [`ProtocolState::Connected`], returning the
    /// state it was in before.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionNotFound`] if `id` is not registered.
    pub async fn mark_connected(&self, id: SessionId) -> Result<ProtocolState, BrokerError> {
        let mut map = self.sessions.write().await;
        let handle = map.get_mut(&id).ok_or(BrokerError::SessionNotFound(id))?;
        let previous = handle.state;
        handle.state = ProtocolState::Connected;
        Ok(previous)
    }

    /// Returns the session's protocol state, or `None` if unknown.
    pub async fn state(&self, id: SessionId) -> Option<ProtocolState> {
        self.sessions.read().await.get(&id).map(SessionHandle::state)
    }

    /// Removes the session. Returns `true` if it was registered.
    pub async fn unregister(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Removes every session, returning their ids. Dropping the handles
    /// closes each outbound queue, which ends the owning connection.
    pub async fn drain(&self) -> Vec<SessionId> {
        self.sessions
            .write()
            .await
            .drain()
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
