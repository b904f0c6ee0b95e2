//! The in-memory session projection: lifecycle, channel attachment, and
//! request/cancellation bookkeeping (spec §4.1, §4.3).
//!
//! A [`Session`] wraps a [`SessionStore`] handle for one session id. It is
//! the thing a protocol router actually talks to; the store underneath is
//! swappable and knows nothing about attached transports.

use crate::data::SessionData;
use crate::error::{Error, Result};
use crate::event::{ChannelId, Event, EventId, EventKind};
use crate::id::SessionId;
use crate::store::SessionStore;
use dashmap::DashMap;
use mcp_runtime_protocol::correlation::{CancellationToken, IdGenerator, PendingRequest};
use mcp_runtime_protocol::jsonrpc::{JsonRpcMessage, RequestId};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Lifecycle state of a session. Grounded on
/// `turbomcp-transport-streamable/src/session.rs`'s `SessionState`, trimmed
/// to what this runtime actually distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A channel is attached and forwarding events live.
    Active,
    /// No channel attached, but not yet past the idle timeout; a client can
    /// still resume.
    Pending,
    /// Explicitly ended by the client or server; cannot resume.
    Terminated,
}

/// A live transport attachment a session can push events through.
///
/// Implementations adapt this to a concrete transport (SSE stream, raw
/// stdio pipe, ...); the session engine only needs to be able to push one
/// event at a time and learn when the attachment has gone away.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    async fn push(&self, event: &Event) -> std::result::Result<(), ChannelClosed>;
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("channel closed")]
pub struct ChannelClosed;

struct Attachment {
    channel_id: ChannelId,
    channel: Arc<dyn Channel>,
}

/// An in-memory projection of one session: lifecycle state, the currently
/// attached channel (if any), and outstanding server-to-client requests
/// (e.g. `sampling/createMessage`, `elicitation/create`) awaiting a reply.
pub struct Session {
    id: SessionId,
    store: Arc<dyn SessionStore>,
    state: RwLock<SessionState>,
    attachment: RwLock<Option<Attachment>>,
    next_event_id: AtomicU64,
    first_activity_millis: u64,
    last_activity_millis: AtomicU64,
    pending_requests: DashMap<RequestId, PendingRequest>,
    /// Cancellation tokens for requests the *client* sent to the server,
    /// keyed by the client's request id, so a `notifications/cancelled`
    /// can reach the in-flight handler task (spec §5 cancellation).
    inbound_cancellations: DashMap<RequestId, CancellationToken>,
    id_generator: IdGenerator,
}

impl Session {
    /// Create a new session and persist its initial data. Corresponds to
    /// the server's `initializeSession` operation (spec §4.3).
    pub async fn initialize(
        id: SessionId,
        store: Arc<dyn SessionStore>,
        data: SessionData,
    ) -> Result<Self> {
        store.create(id.clone(), data).await?;
        let now = crate::event::now_millis();
        Ok(Self {
            id,
            store,
            state: RwLock::new(SessionState::Pending),
            attachment: RwLock::new(None),
            next_event_id: AtomicU64::new(1),
            first_activity_millis: now,
            last_activity_millis: AtomicU64::new(now),
            pending_requests: DashMap::new(),
            inbound_cancellations: DashMap::new(),
            id_generator: IdGenerator::new(),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn first_activity_millis(&self) -> u64 {
        self.first_activity_millis
    }

    pub fn last_activity_millis(&self) -> u64 {
        self.last_activity_millis.load(Ordering::Relaxed)
    }

    pub async fn data(&self) -> Result<SessionData> {
        self.store
            .get(&self.id)
            .await?
            .ok_or_else(|| Error::NotFound(self.id.clone()))
    }

    pub async fn update_data(&self, data: SessionData) -> Result<()> {
        self.store.put(&self.id, data).await
    }

    fn touch(&self, at: u64) {
        self.last_activity_millis.store(at, Ordering::Relaxed);
    }

    fn reserve_event_id(&self) -> EventId {
        self.next_event_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Attach a new channel, mark the session active, and record a
    /// `ChannelStarted` event.
    pub async fn attach_channel(&self, channel_id: ChannelId, channel: Arc<dyn Channel>) -> Result<()> {
        if self.state() == SessionState::Terminated {
            return Err(Error::Terminated(self.id.clone()));
        }
        *self.attachment.write() = Some(Attachment {
            channel_id: channel_id.clone(),
            channel,
        });
        *self.state.write() = SessionState::Active;
        self.record(EventKind::ChannelStarted, channel_id).await
    }

    /// Detach the current channel without terminating the session (spec
    /// §4.3 `pause`). The session becomes resumable via [`Session::resume`].
    pub async fn pause(&self) -> Result<()> {
        let attachment = self.attachment.write().take();
        if let Some(attachment) = attachment {
            *self.state.write() = SessionState::Pending;
            self.record(EventKind::ChannelEnded, attachment.channel_id)
                .await?;
        }
        Ok(())
    }

    /// Permanently end the session. Per the resolved Open Question,
    /// termination cancels every outstanding server-to-client request
    /// immediately rather than letting them drain.
    pub async fn terminate(&self) -> Result<()> {
        *self.state.write() = SessionState::Terminated;
        self.attachment.write().take();
        for entry in self.pending_requests.iter() {
            entry.value().cancel();
        }
        self.pending_requests.clear();
        for entry in self.inbound_cancellations.iter() {
            entry.value().cancel();
        }
        self.inbound_cancellations.clear();
        Ok(())
    }

    /// Replace the attached channel with a new one. Implements the two
    /// resumption branches of spec §4.3: a warm swap (`from_store = false`,
    /// the session was already live in the caller's active-sessions map)
    /// just moves the channel writer in place and does NOT emit
    /// `channel-started`; a cold hydrate (`from_store = true`, the caller
    /// just reconstructed this projection from the durable store) replays
    /// every event recorded after `after` before resuming live forwarding
    /// and does append `channel-started`.
    pub async fn resume(
        &self,
        after: Option<EventId>,
        channel_id: ChannelId,
        channel: Arc<dyn Channel>,
        from_store: bool,
    ) -> Result<()> {
        if self.state() == SessionState::Terminated {
            return Err(Error::Terminated(self.id.clone()));
        }
        if !from_store {
            *self.attachment.write() = Some(Attachment { channel_id, channel });
            *self.state.write() = SessionState::Active;
            return Ok(());
        }
        let backlog = self.store.events_since(&self.id, after).await?;
        for event in &backlog {
            if channel.push(event).await.is_err() {
                return Err(Error::NoChannelAttached(self.id.clone()));
            }
        }
        *self.attachment.write() = Some(Attachment {
            channel_id: channel_id.clone(),
            channel,
        });
        *self.state.write() = SessionState::Active;
        self.record(EventKind::ChannelStarted, channel_id).await
    }

    /// Reconstruct the in-memory projection for a session that already
    /// exists in the store but has no live projection (the cold-resume
    /// path of spec §4.3 step 3). The next event id continues from the
    /// tail of the durable log so replayed history and newly recorded
    /// events never collide.
    pub async fn from_store(id: SessionId, store: Arc<dyn SessionStore>) -> Result<Self> {
        let existing = store.events_since(&id, None).await?;
        let next_event_id = existing.last().map(|e| e.id + 1).unwrap_or(1);
        let now = crate::event::now_millis();
        Ok(Self {
            id,
            store,
            state: RwLock::new(SessionState::Pending),
            attachment: RwLock::new(None),
            next_event_id: AtomicU64::new(next_event_id),
            first_activity_millis: now,
            last_activity_millis: AtomicU64::new(now),
            pending_requests: DashMap::new(),
            inbound_cancellations: DashMap::new(),
            id_generator: IdGenerator::new(),
        })
    }

    /// Append an event to the durable log and, if a channel is attached,
    /// push it live. This is the push/pull hybrid: a disconnected session
    /// keeps recording so a later [`Session::resume`] can replay the
    /// backlog.
    async fn record(&self, kind: EventKind, channel_id: ChannelId) -> Result<()> {
        let now = crate::event::now_millis();
        self.touch(now);
        let event = Event {
            id: self.reserve_event_id(),
            kind,
            occurred_at: now,
            channel_id,
            recorded_at: Some(now),
        };
        self.store.append_event(&self.id, event.clone()).await?;
        self.push_if_attached(&event).await;
        Ok(())
    }

    async fn push_if_attached(&self, event: &Event) {
        let channel = self.attachment.read().as_ref().map(|a| a.channel.clone());
        if let Some(channel) = channel {
            let _ = channel.push(event).await;
        }
    }

    /// Record an inbound client message against this session's event log.
    pub async fn record_client_message(
        &self,
        envelope: JsonRpcMessage,
        response_to_request_id: Option<RequestId>,
    ) -> Result<()> {
        let channel_id = self.current_channel_id();
        let now = crate::event::now_millis();
        self.touch(now);
        let event = Event {
            id: self.reserve_event_id(),
            kind: EventKind::ClientMessage {
                envelope,
                response_to_request_id,
            },
            occurred_at: now,
            channel_id,
            recorded_at: Some(now),
        };
        self.store.append_event(&self.id, event).await
    }

    /// Record and forward an outbound server message (response or
    /// notification) to the attached channel, if any.
    pub async fn reply(
        &self,
        envelope: JsonRpcMessage,
        response_to_request_id: Option<RequestId>,
    ) -> Result<()> {
        let channel_id = self.current_channel_id();
        let now = crate::event::now_millis();
        self.touch(now);
        let event = Event {
            id: self.reserve_event_id(),
            kind: EventKind::ServerMessage {
                envelope,
                response_to_request_id,
            },
            occurred_at: now,
            channel_id,
            recorded_at: Some(now),
        };
        self.store.append_event(&self.id, event.clone()).await?;
        self.push_if_attached(&event).await;
        Ok(())
    }

    fn current_channel_id(&self) -> ChannelId {
        self.attachment
            .read()
            .as_ref()
            .map(|a| a.channel_id.clone())
            .unwrap_or_else(|| ChannelId("detached".into()))
    }

    /// Register a server-to-client request (e.g. `sampling/createMessage`)
    /// awaiting a correlated reply, and return the id to send plus a
    /// receiver for the eventual response.
    pub fn begin_request(&self, method: impl Into<String>) -> (RequestId, oneshot::Receiver<mcp_runtime_protocol::jsonrpc::JsonRpcResponse>) {
        let id = self.id_generator.next_id();
        let (pending, rx) = PendingRequest::new(method.into());
        self.pending_requests.insert(id.clone(), pending);
        (id, rx)
    }

    /// Resolve a previously-registered server-to-client request with the
    /// client's response.
    pub fn complete_request(&self, id: &RequestId, response: mcp_runtime_protocol::jsonrpc::JsonRpcResponse) {
        if let Some((_, mut pending)) = self.pending_requests.remove(id) {
            pending.resolve(response);
        }
    }

    pub fn has_pending_request(&self, id: &RequestId) -> bool {
        self.pending_requests.contains_key(id)
    }

    /// Start tracking a client-initiated request's cancellation token, for
    /// the duration of its handler call.
    pub fn begin_inbound(&self, id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        self.inbound_cancellations.insert(id, token.clone());
        token
    }

    /// Stop tracking a client-initiated request, once its handler call has
    /// returned (successfully or not).
    pub fn end_inbound(&self, id: &RequestId) {
        self.inbound_cancellations.remove(id);
    }

    /// Cancel an in-flight client-initiated request by id, in response to a
    /// `notifications/cancelled`. A no-op if the id is unknown (request
    /// already completed, or never existed).
    pub fn cancel_inbound(&self, id: &RequestId) {
        if let Some(token) = self.inbound_cancellations.get(id) {
            token.cancel();
        }
    }
}
