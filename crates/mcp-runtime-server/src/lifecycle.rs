//! Session lifecycle management (spec §4.3): `initializeSession`, `resume`,
//! `pause`, `terminate`, `cleanupInactiveSessions`.
//!
//! Grounded on `turbomcp-transport-streamable/src/session.rs`'s
//! `SessionStore::cleanup_expired` plus the background-sweep pattern common
//! across the teacher's server crate (a periodic `tokio::time::interval`
//! loop spawned alongside the main service).

use crate::error::{Error, Result};
use mcp_runtime_protocol::ProtocolVersion;
use mcp_runtime_session::{
    now_millis, Capabilities, ChannelId, Event, EventId, ImplementationInfo, Session, SessionData,
    SessionId, SessionStore, SubscriptionIndex,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Owns every live [`Session`] projection plus the shared subscription
/// index, and drives the idle-session sweep.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    sessions: DashMap<SessionId, Arc<Session>>,
    pub subscriptions: SubscriptionIndex,
    max_idle: Duration,
    cleanup_interval: Duration,
}

/// Enforce spec §4.9: a session with a recorded `userId` may only be
/// resumed or terminated by that same `userId`; anonymous sessions
/// (`userId == None`) are resumable by anyone presenting the session id.
fn check_ownership(owner: Option<&str>, caller: Option<&str>) -> Result<()> {
    match owner {
        Some(owner_id) if Some(owner_id) != caller => Err(Error::Protocol(
            mcp_runtime_protocol::Error::AuthorizationFailed(
                "session is owned by a different userId".to_string(),
            ),
        )),
        _ => Ok(()),
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, max_idle: Duration, cleanup_interval: Duration) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            subscriptions: SubscriptionIndex::new(),
            max_idle,
            cleanup_interval,
        }
    }

    /// Create a new session, negotiating the protocol version against the
    /// client's requested version (spec §4.2, seed scenario S1).
    pub async fn initialize_session(
        &self,
        requested_version: Option<&str>,
        client_info: ImplementationInfo,
        client_capabilities: Capabilities,
        server_info: ImplementationInfo,
        server_capabilities: Capabilities,
        id_hint: Option<String>,
    ) -> Result<Arc<Session>> {
        let version = ProtocolVersion::negotiate(requested_version);
        let id = match id_hint {
            Some(hint) => SessionId::try_new(hint.clone()).unwrap_or_else(|| {
                tracing::warn!(hint = %hint, "rejected externally-supplied session id, generating one");
                SessionId::generate()
            }),
            None => SessionId::generate(),
        };
        let data = SessionData::new(
            version,
            client_info,
            client_capabilities,
            server_info,
            server_capabilities,
        );
        let session = Session::initialize(id.clone(), self.store.clone(), data).await?;
        let session = Arc::new(session);
        self.sessions.insert(id, session.clone());
        Ok(session)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| s.clone())
    }

    /// Resume a session by id (spec §4.3 `resume`), per `caller_user_id`'s
    /// ownership: the warm branch swaps the channel in place against an
    /// already-live session; the cold branch hydrates one from the store
    /// when it isn't (yet) in the active-sessions map.
    pub async fn resume(
        &self,
        id: &SessionId,
        caller_user_id: Option<&str>,
        after: Option<EventId>,
        channel_id: ChannelId,
        channel: Arc<dyn mcp_runtime_session::Channel>,
    ) -> Result<Arc<Session>> {
        if let Some(session) = self.get(id) {
            let data = session.data().await?;
            check_ownership(data.user_id.as_deref(), caller_user_id)?;
            session.resume(after, channel_id, channel, false).await?;
            return Ok(session);
        }

        let data = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::Session(mcp_runtime_session::Error::NotFound(id.clone())))?;
        check_ownership(data.user_id.as_deref(), caller_user_id)?;

        let session = Session::from_store(id.clone(), self.store.clone()).await?;
        let session = Arc::new(session);
        session.resume(after, channel_id, channel, true).await?;
        self.sessions.insert(id.clone(), session.clone());
        Ok(session)
    }

    /// Detach a session's channel, evict it from the active-sessions map
    /// and the subscription index, but keep it in the store so it remains
    /// resumable (spec §4.3 `pause`).
    pub async fn pause(&self, id: &SessionId) -> Result<()> {
        let session = self
            .get(id)
            .ok_or_else(|| Error::Session(mcp_runtime_session::Error::NotFound(id.clone())))?;
        session.pause().await?;
        self.sessions.remove(id);
        self.subscriptions.remove_session(id);
        Ok(())
    }

    /// Permanently end a session (spec §4.3 `terminate`): validate
    /// ownership first, then pause it, then drop it from the store.
    pub async fn terminate(&self, id: &SessionId, caller_user_id: Option<&str>) -> Result<()> {
        let owner = match self.get(id) {
            Some(session) => session.data().await?.user_id,
            None => {
                self.store
                    .get(id)
                    .await?
                    .ok_or_else(|| Error::Session(mcp_runtime_session::Error::NotFound(id.clone())))?
                    .user_id
            }
        };
        check_ownership(owner.as_deref(), caller_user_id)?;

        if let Some((_, session)) = self.sessions.remove(id) {
            session.pause().await?;
            session.terminate().await?;
        }
        self.subscriptions.remove_session(id);
        self.store.destroy(id).await?;
        Ok(())
    }

    /// Evict every session idle longer than `max_idle` from both the store
    /// and the live session map (spec §4.3 `cleanupInactiveSessions`).
    pub async fn cleanup_inactive_sessions(&self) -> Result<Vec<SessionId>> {
        let now = now_millis();
        let expired = self
            .store
            .cleanup_expired(now, self.max_idle.as_millis() as u64)
            .await?;
        for id in &expired {
            self.sessions.remove(id);
            self.subscriptions.remove_session(id);
        }
        Ok(expired)
    }

    /// Spawn the periodic idle-session sweep. The returned handle can be
    /// aborted to stop it; dropping the handle does not stop the task.
    pub fn spawn_cleanup_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.cleanup_inactive_sessions().await {
                    Ok(expired) if !expired.is_empty() => {
                        tracing::info!(count = expired.len(), "evicted idle sessions");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "cleanup_inactive_sessions failed"),
                }
            }
        })
    }
}
