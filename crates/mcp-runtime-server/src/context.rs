//! Per-request context threaded through handler calls.

use mcp_runtime_session::{Channel, ChannelId, EventId, SessionId};
use std::sync::Arc;

/// Context available to a handler while servicing one request.
///
/// Grounded on `turbomcp_core::context::RequestContext`, trimmed to the
/// fields this runtime's handlers actually need: which session issued the
/// request, and (if authenticated) which principal.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session_id: SessionId,
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn new(session_id: SessionId, user_id: Option<String>) -> Self {
        Self {
            session_id,
            user_id,
        }
    }
}

/// Everything needed to resolve and resume a session before an envelope can
/// be dispatched: which session, which transport attachment, and (if
/// authenticated) which principal is making the call. This is the
/// `connectionContext` of `handleMessage(envelope, connectionContext)`
/// (spec §4.2).
pub struct ConnectionContext {
    pub session_id: SessionId,
    pub channel_id: ChannelId,
    pub channel: Arc<dyn Channel>,
    /// Last event id the caller has already seen, for backlog replay on a
    /// cold resume. `None` replays the whole log.
    pub after: Option<EventId>,
    pub user_id: Option<String>,
}
