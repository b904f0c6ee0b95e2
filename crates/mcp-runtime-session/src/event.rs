//! The session event log (spec §3 "Event", §4.1).

use mcp_runtime_protocol::jsonrpc::{JsonRpcMessage, RequestId};
use serde::{Deserialize, Serialize};

/// A sortable event id, unique within a session. Assigned by
/// [`crate::session::Session`] in strictly increasing append order, which is
/// sufficient to satisfy "sortable within session" (spec §3) without a
/// global clock.
pub type EventId = u64;

/// An identifier for a transport attachment ("channel"). A session may be
/// attached to at most one channel at a time, but sees many over its life as
/// the client reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// The payload carried by an event. Tagged per spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventKind {
    /// Inbound request/notification from the client.
    ClientMessage {
        envelope: JsonRpcMessage,
        /// Set when this is a reply to a server-to-client request.
        #[serde(skip_serializing_if = "Option::is_none")]
        response_to_request_id: Option<RequestId>,
    },
    /// Outbound request/notification/response from the server.
    ServerMessage {
        envelope: JsonRpcMessage,
        /// Set for responses: the request id this event completes.
        #[serde(skip_serializing_if = "Option::is_none")]
        response_to_request_id: Option<RequestId>,
    },
    /// A transport attachment began.
    ChannelStarted,
    /// A transport attachment ended (disconnect, explicit pause).
    ChannelEnded,
}

/// A single entry in a session's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    /// Milliseconds since the Unix epoch. Non-decreasing per channel; may
    /// interleave with other channels' timestamps (spec §3 invariant).
    pub occurred_at: u64,
    pub channel_id: ChannelId,
    /// Set once this event has been durably persisted by the store, as
    /// opposed to only existing in the in-memory projection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<u64>,
}

impl Event {
    /// The request id this event is a reply to, if any. Used by the
    /// resumption algorithm (spec §4.1) to replay the tail of an in-flight
    /// request's partial outputs.
    pub fn response_to_request_id(&self) -> Option<&RequestId> {
        match &self.kind {
            EventKind::ClientMessage {
                response_to_request_id,
                ..
            }
            | EventKind::ServerMessage {
                response_to_request_id,
                ..
            } => response_to_request_id.as_ref(),
            EventKind::ChannelStarted | EventKind::ChannelEnded => None,
        }
    }

    /// `true` if this event is a terminal JSON-RPC response (result or
    /// error), as opposed to a progress notification tagged with the same
    /// `response_to_request_id`.
    pub fn is_terminal_response(&self) -> bool {
        matches!(
            &self.kind,
            EventKind::ServerMessage {
                envelope: JsonRpcMessage::Response(_),
                ..
            }
        )
    }
}

/// Current Unix-epoch milliseconds. Centralized so tests can reason about a
/// single source of "now" if it is ever made injectable.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
