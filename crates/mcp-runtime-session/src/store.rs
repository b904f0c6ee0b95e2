//! The durable session store (spec §4.1).
//!
//! Grounded on `turbomcp-transport-streamable/src/session.rs`'s
//! `SessionStore` trait: create/get/update/store_event/replay_from/destroy/
//! cleanup_expired. This runtime additionally supports a push/pull hybrid —
//! callers can either poll [`SessionStore::events_since`] or hold a live
//! [`crate::session::Session`] projection and receive pushes directly.

use crate::data::SessionData;
use crate::event::{Event, EventId};
use crate::id::SessionId;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// A persisted session record: durable attributes plus its append-only
/// event log.
#[derive(Debug, Clone)]
struct Record {
    data: SessionData,
    events: Vec<Event>,
    last_activity_millis: u64,
}

/// Durable storage for session data and event logs.
///
/// Implementations must guarantee that [`append_event`](SessionStore::append_event)
/// preserves insertion order per session, since resumption (spec §4.1)
/// depends on being able to locate a `lastEventId` and replay everything
/// after it in order.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, id: SessionId, data: SessionData) -> Result<()>;

    async fn get(&self, id: &SessionId) -> Result<Option<SessionData>>;

    /// Replace a session's durable attributes wholesale. The session engine
    /// reads, mutates its own copy, then writes it back; the store does not
    /// need to expose fine-grained field updates.
    async fn put(&self, id: &SessionId, data: SessionData) -> Result<()>;

    async fn append_event(&self, id: &SessionId, event: Event) -> Result<()>;

    /// All events with `id > after` (or all events, if `after` is `None`),
    /// in ascending order.
    async fn events_since(&self, id: &SessionId, after: Option<EventId>) -> Result<Vec<Event>>;

    async fn destroy(&self, id: &SessionId) -> Result<()>;

    /// Remove and return the ids of every session whose `last_activity` is
    /// older than `now_millis - max_idle_millis` (spec §4.3
    /// `cleanupInactiveSessions`).
    async fn cleanup_expired(&self, now_millis: u64, max_idle_millis: u64) -> Result<Vec<SessionId>>;
}

/// An in-memory [`SessionStore`]. The reference implementation; production
/// deployments needing cross-process durability swap this for a database-
/// backed implementation of the same trait.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    records: Arc<DashMap<SessionId, Record>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, id: SessionId, data: SessionData) -> Result<()> {
        self.records.insert(
            id,
            Record {
                data,
                events: Vec::new(),
                last_activity_millis: crate::event::now_millis(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionData>> {
        Ok(self.records.get(id).map(|r| r.data.clone()))
    }

    async fn put(&self, id: &SessionId, data: SessionData) -> Result<()> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        record.data = data;
        record.last_activity_millis = crate::event::now_millis();
        Ok(())
    }

    async fn append_event(&self, id: &SessionId, event: Event) -> Result<()> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        record.last_activity_millis = event.occurred_at;
        record.events.push(event);
        Ok(())
    }

    async fn events_since(&self, id: &SessionId, after: Option<EventId>) -> Result<Vec<Event>> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        let events = match after {
            None => record.events.clone(),
            Some(after) => record
                .events
                .iter()
                .filter(|e| e.id > after)
                .cloned()
                .collect(),
        };
        Ok(events)
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        self.records.remove(id);
        Ok(())
    }

    async fn cleanup_expired(&self, now_millis: u64, max_idle_millis: u64) -> Result<Vec<SessionId>> {
        let cutoff = now_millis.saturating_sub(max_idle_millis);
        let expired: Vec<SessionId> = self
            .records
            .iter()
            .filter(|entry| entry.value().last_activity_millis < cutoff)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &expired {
            self.records.remove(id);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Capabilities, ImplementationInfo};
    use crate::event::{ChannelId, EventKind};
    use mcp_runtime_protocol::ProtocolVersion;
    use mcp_runtime_protocol::jsonrpc::{JsonRpcMessage, JsonRpcNotification};

    fn sample_data() -> SessionData {
        SessionData::new(
            ProtocolVersion::latest(),
            ImplementationInfo::default(),
            Capabilities::default(),
            ImplementationInfo::default(),
            Capabilities::default(),
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store.create(id.clone(), sample_data()).await.unwrap();
        let fetched = store.get(&id).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn get_missing_session_returns_none() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_event_then_filter_by_after() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store.create(id.clone(), sample_data()).await.unwrap();

        for i in 1..=3u64 {
            let ev = Event {
                id: i,
                kind: EventKind::ServerMessage {
                    envelope: JsonRpcMessage::Notification(JsonRpcNotification::new(
                        "notifications/progress",
                        None,
                    )),
                    response_to_request_id: None,
                },
                occurred_at: crate::event::now_millis(),
                channel_id: ChannelId("c1".into()),
                recorded_at: Some(crate::event::now_millis()),
            };
            store.append_event(&id, ev).await.unwrap();
        }

        let all = store.events_since(&id, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let after_one = store.events_since(&id, Some(1)).await.unwrap();
        assert_eq!(after_one.len(), 2);
        assert_eq!(after_one[0].id, 2);
    }

    #[tokio::test]
    async fn cleanup_expired_removes_stale_sessions() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store.create(id.clone(), sample_data()).await.unwrap();

        let now = crate::event::now_millis();
        let expired = store.cleanup_expired(now + 1_000_000, 1000).await.unwrap();
        assert_eq!(expired, vec![id.clone()]);
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_removes_session() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store.create(id.clone(), sample_data()).await.unwrap();
        store.destroy(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
