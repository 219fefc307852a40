//! Per-session subscription storage.
//!
//! [`SubscriptionTable`] maps each session to its own
//! `subscription-id → destination` map. Subscription ids are chosen by the
//! client and are only unique within one session, so the same id may
//! appear under many sessions.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::SessionId;

/// One session's subscriptions, keyed by subscription id.
type SessionSubscriptions = HashMap<String, String>;

/// Subscription table, guarded by a single [`RwLock`].
///
/// Destination matching is exact and case-sensitive: no wildcards and no
/// hierarchy.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    sessions: RwLock<HashMap<SessionId, SessionSubscriptions>>,
}

impl SubscriptionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `session` wants messages for `destination` under
    /// `subscription_id`.
    ///
    /// Re-using an id the session already holds moves that subscription to
    /// the new destination. Returns the destination previously bound to the
    /// id, if any.
    pub async fn subscribe(
        &self,
        session: SessionId,
        subscription_id: &str,
        destination: &str,
    ) -> Option<String> {
        self.sessions
            .write()
            .await
            .entry(session)
            .or_default()
            .insert(subscription_id.to_string(), destination.to_string())
    }

    /// Removes a single subscription, leaving the session's other
    /// subscriptions untouched. Returns the destination it was bound to.
    pub async fn unsubscribe(&self, session: SessionId, subscription_id: &str) -> Option<String> {
        let mut map = self.sessions.write().await;
        let subs = map.get_mut(&session)?;
        let removed = subs.remove(subscription_id);
        if subs.is_empty() {
            map.remove(&session);
        }
        removed
    }

    /// Drops every subscription held by `session`. Returns how many were
    /// removed.
    pub async fn unsubscribe_all(&self, session: SessionId) -> usize {
        self.sessions
            .write()
            .await
            .remove(&session)
            .map_or(0, |subs| subs.len())
    }

    /// Drops every subscription of every session. Returns how many were
    /// removed.
    pub async fn clear(&self) -> usize {
        let mut map = self.sessions.write().await;
        let removed: usize = map.values().map(HashMap::len).sum();
        map.clear();
        removed
    }

    /// Returns every `(session, subscription id)` pair bound to exactly
    /// `destination`.
    pub async fn destinations_matching(&self, destination: &str) -> Vec<(SessionId, String)> {
        let map = self.sessions.read().await;
        let mut matches = Vec::new();
        for (session, subs) in map.iter() {
            for (sub_id, dest) in subs {
                if dest == destination {
                    matches.push((*session, sub_id.clone()));
                }
            }
        }
        matches
    }

    /// Returns the destination bound to one subscription.
    #[cfg(test)]
    pub(crate) async fn destination_of(&self, session: SessionId, subscription_id: &str) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(&session)
            .and_then(|subs| subs.get(subscription_id).cloned())
    }

    /// Total number of subscriptions across all sessions.
    pub async fn subscription_count(&self) -> usize {
        self.sessions.read().await.values().map(HashMap::len).sum()
    }
}
