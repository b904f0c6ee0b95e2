//! Resource subscription index (spec §4.4).
//!
//! Maps resource URIs to the set of sessions subscribed to them, so that
//! `notifications/resources/updated` can be fanned out without scanning
//! every live session. Grounded on the reverse-index pattern used by
//! `turbomcp-server`'s subscription bookkeeping (tracked per-session on the
//! handler side there; here centralized since a single resource can be
//! watched by many sessions).

use crate::id::SessionId;
use dashmap::DashMap;
use std::collections::HashSet;

/// A URI → subscribed-session-ids reverse index.
///
/// Invariant: a URI never appears as a key with an empty value set — the
/// entry is removed instead, so `len()` reflects only actively-watched URIs.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_uri: DashMap<String, HashSet<SessionId>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `session` is now watching `uri`.
    pub fn subscribe(&self, uri: impl Into<String>, session: SessionId) {
        self.by_uri.entry(uri.into()).or_default().insert(session);
    }

    /// Remove `session`'s watch on `uri`. Drops the URI entry entirely once
    /// its subscriber set becomes empty.
    pub fn unsubscribe(&self, uri: &str, session: &SessionId) {
        if let Some(mut set) = self.by_uri.get_mut(uri) {
            set.remove(session);
            if set.is_empty() {
                drop(set);
                self.by_uri.remove(uri);
            }
        }
    }

    /// Remove every subscription held by `session`, across all URIs. Called
    /// when a session terminates (spec §4.3).
    pub fn remove_session(&self, session: &SessionId) {
        self.by_uri.retain(|_, set| {
            set.remove(session);
            !set.is_empty()
        });
    }

    /// The sessions currently subscribed to `uri`, for fan-out.
    pub fn subscribers(&self, uri: &str) -> Vec<SessionId> {
        self.by_uri
            .get(uri)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of distinct URIs with at least one subscriber.
    pub fn watched_uri_count(&self) -> usize {
        self.by_uri.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u8) -> SessionId {
        SessionId::try_new(format!("s{n}")).unwrap()
    }

    #[test]
    fn subscribe_then_subscribers_returns_session() {
        let idx = SubscriptionIndex::new();
        idx.subscribe("file:///a.txt", sid(1));
        assert_eq!(idx.subscribers("file:///a.txt"), vec![sid(1)]);
    }

    #[test]
    fn unsubscribe_removes_empty_entry() {
        let idx = SubscriptionIndex::new();
        idx.subscribe("file:///a.txt", sid(1));
        idx.unsubscribe("file:///a.txt", &sid(1));
        assert!(idx.subscribers("file:///a.txt").is_empty());
        assert_eq!(idx.watched_uri_count(), 0);
    }

    #[test]
    fn remove_session_clears_all_its_subscriptions() {
        let idx = SubscriptionIndex::new();
        idx.subscribe("file:///a.txt", sid(1));
        idx.subscribe("file:///b.txt", sid(1));
        idx.subscribe("file:///b.txt", sid(2));
        idx.remove_session(&sid(1));
        assert!(idx.subscribers("file:///a.txt").is_empty());
        assert_eq!(idx.subscribers("file:///b.txt"), vec![sid(2)]);
    }

    #[test]
    fn multiple_sessions_can_watch_same_uri() {
        let idx = SubscriptionIndex::new();
        idx.subscribe("file:///a.txt", sid(1));
        idx.subscribe("file:///a.txt", sid(2));
        let mut subs = idx.subscribers("file:///a.txt");
        subs.sort();
        assert_eq!(subs, vec![sid(1), sid(2)]);
    }
}
