//! Request/response correlation primitives shared by the session engine and
//! the client connector (spec §3 "PendingRequest", §5 "Cancellation").
//!
//! Both directions of MCP traffic — a server issuing `sampling/createMessage`
//! to a client, or a client issuing `tools/call` to a server — need the same
//! shape: track an outstanding request by id, resolve it when the matching
//! response arrives, and allow it to be cancelled out-of-band. This module
//! is the one place that shape is defined.

use crate::jsonrpc::{JsonRpcResponse, RequestId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Notify, oneshot};

/// A cooperative cancellation signal, analogous to an `AbortSignal`.
///
/// Cheaply cloneable; all clones observe the same cancellation.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signal cancellation to every holder of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation occurs. A no-op await if already cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// An outstanding request awaiting a reply, keyed externally by [`RequestId`].
///
/// Holds the resolver half of a oneshot channel; the matching receiver is
/// handed to the caller that issued the request. Dropping a `PendingRequest`
/// without resolving it causes the receiver to observe a closed channel,
/// which callers treat the same as a cancellation.
pub struct PendingRequest {
    pub method: String,
    pub started_at: Instant,
    pub cancellation: CancellationToken,
    resolver: Option<oneshot::Sender<JsonRpcResponse>>,
}

impl PendingRequest {
    /// Create a new pending request, returning it alongside the receiver the
    /// caller should await for the eventual response.
    pub fn new(method: impl Into<String>) -> (Self, oneshot::Receiver<JsonRpcResponse>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                method: method.into(),
                started_at: Instant::now(),
                cancellation: CancellationToken::new(),
                resolver: Some(tx),
            },
            rx,
        )
    }

    /// Resolve this pending request with the matching response. Idempotent:
    /// a second call is a no-op (the resolver is consumed on first use).
    pub fn resolve(&mut self, response: JsonRpcResponse) {
        if let Some(tx) = self.resolver.take() {
            let _ = tx.send(response);
        }
    }

    /// Cancel this pending request: signal its cancellation token. The
    /// resolver is left untouched — a late reply may still arrive and should
    /// still be delivered to a caller that chose to keep waiting.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("method", &self.method)
            .field("started_at", &self.started_at)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

/// Monotonic numeric id generator for outbound requests, as used by the
/// client connector and by server-initiated requests (spec §4.5).
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: std::sync::atomic::AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: std::sync::atomic::AtomicI64::new(1),
        }
    }

    pub fn next_id(&self) -> RequestId {
        RequestId::Number(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pending_request_resolves_receiver() {
        let (mut pending, rx) = PendingRequest::new("tools/call");
        pending.resolve(JsonRpcResponse::success(RequestId::Number(1), json!({})));
        let resp = rx.await.unwrap();
        assert!(resp.is_success());
    }

    #[tokio::test]
    async fn cancellation_token_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn id_generator_is_monotonic() {
        let gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_ne!(a, b);
    }
}
