//! The client connector: connect/disconnect/send plus request/response
//! correlation (spec §4.5).
//!
//! Grounded on `turbomcp-client/src/client/dispatcher.rs`'s
//! `MessageDispatcher`: a `response_waiters` map keyed by request id, a
//! background routing task looping on `transport.receive()` with
//! exponential backoff on consecutive errors, and a `Notify`-based shutdown
//! signal. This runtime's [`Transport`] trait is intentionally narrower
//! than the teacher's (no capability negotiation, no multiplexed streams)
//! since transport adapters are out of this crate's scope (spec Non-goals).

use crate::error::{Error, Result};
use crate::retry::BackoffPolicy;
use dashmap::DashMap;
use mcp_runtime_protocol::correlation::IdGenerator;
use mcp_runtime_protocol::jsonrpc::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};

/// A raw, framework-agnostic duplex transport: push an outbound frame,
/// pull the next inbound frame. Adapters for concrete wire protocols
/// (stdio, WebSocket, streamable HTTP) implement this trait; none are
/// provided here.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send_frame(&self, raw: String) -> std::result::Result<(), String>;

    /// The next inbound frame, or `Ok(None)` once the transport has closed
    /// cleanly.
    async fn receive_frame(&self) -> std::result::Result<Option<String>, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Why a connector is disconnecting, carried on the best-effort
/// `notifications/session/terminated` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Error,
    Timeout,
}

impl DisconnectReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// Callback invoked for inbound server-to-client requests/notifications
/// (e.g. `sampling/createMessage`, `notifications/resources/updated`).
pub type InboundHandler = Arc<dyn Fn(JsonRpcMessage) + Send + Sync>;

/// Correlates outbound requests with inbound responses over one
/// [`Transport`], and dispatches inbound requests/notifications to a
/// caller-supplied handler.
pub struct Connector<T: Transport + 'static> {
    transport: Arc<T>,
    state: RwLock<ConnectionState>,
    waiters: Arc<DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>,
    id_gen: IdGenerator,
    shutdown: Arc<Notify>,
    inbound_handler: RwLock<Option<InboundHandler>>,
    backoff: BackoffPolicy,
    /// Session id learned from the `initialize` response, echoed back on
    /// the best-effort termination notification.
    session_id: RwLock<Option<String>>,
}

impl<T: Transport + 'static> Connector<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            state: RwLock::new(ConnectionState::Disconnected),
            waiters: Arc::new(DashMap::new()),
            id_gen: IdGenerator::new(),
            shutdown: Arc::new(Notify::new()),
            inbound_handler: RwLock::new(None),
            backoff: BackoffPolicy::default(),
            session_id: RwLock::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    pub fn set_inbound_handler(&self, handler: InboundHandler) {
        *self.inbound_handler.write() = Some(handler);
    }

    /// Opens the transport, spawns the background routing task, and
    /// performs the `initialize` handshake before transitioning to
    /// `Connected`. `initialize_params` is sent verbatim as the request's
    /// params (`protocolVersion`, `capabilities`, `clientInfo`, ...).
    ///
    /// Returns the routing task handle on success. On failure the
    /// connector is left `Disconnected` and the routing task is stopped.
    pub async fn connect(
        self: &Arc<Self>,
        initialize_params: Value,
    ) -> Result<tokio::task::JoinHandle<()>> {
        *self.state.write() = ConnectionState::Connecting;
        let task = self.spawn_routing();

        match self.request("initialize", Some(initialize_params)).await {
            Ok(response) if response.is_success() => {
                if let Some(sid) = response
                    .result()
                    .and_then(|r| r.get("sessionId"))
                    .and_then(|v| v.as_str())
                {
                    *self.session_id.write() = Some(sid.to_string());
                }
                *self.state.write() = ConnectionState::Connected;
                Ok(task)
            }
            Ok(response) => {
                self.abort_connect(&task);
                let message = response
                    .error_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "initialize failed".to_string());
                Err(Error::InitializeFailed(message))
            }
            Err(e) => {
                self.abort_connect(&task);
                Err(e)
            }
        }
    }

    /// Spawns the background routing task without touching `state` or
    /// performing the `initialize` handshake. Used by [`Self::connect`];
    /// exposed to tests that exercise `request`/`notify` correlation
    /// directly.
    fn spawn_routing(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.routing_loop().await })
    }

    fn abort_connect(&self, task: &tokio::task::JoinHandle<()>) {
        *self.state.write() = ConnectionState::Disconnected;
        self.shutdown.notify_waiters();
        task.abort();
    }

    /// Best-effort notifies the peer with `notifications/session/terminated`
    /// (errors are ignored), then tears down the routing task and any
    /// pending request waiters.
    pub async fn disconnect(&self, reason: DisconnectReason) {
        *self.state.write() = ConnectionState::Disconnecting;
        let params = json!({
            "sessionId": self.session_id.read().clone(),
            "reason": reason.as_str(),
        });
        let _ = self.notify("notifications/session/terminated", Some(params)).await;
        *self.state.write() = ConnectionState::Disconnected;
        self.shutdown.notify_waiters();
        // Dropping each sender causes its receiver to observe a closed
        // channel, which callers treat the same as cancellation.
        self.waiters.clear();
    }

    async fn routing_loop(self: Arc<Self>) {
        let mut consecutive_errors = 0u32;
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => return,
                received = self.transport.receive_frame() => {
                    match received {
                        Ok(Some(raw)) => {
                            consecutive_errors = 0;
                            self.route_frame(&raw);
                        }
                        Ok(None) => {
                            *self.state.write() = ConnectionState::Disconnected;
                            return;
                        }
                        Err(e) => {
                            consecutive_errors += 1;
                            tracing::warn!(error = %e, consecutive_errors, "transport receive failed");
                            let delay = self.backoff.delay_for(consecutive_errors);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
    }

    fn route_frame(&self, raw: &str) {
        let message = match JsonRpcMessage::parse(raw) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse inbound frame");
                return;
            }
        };
        match message {
            JsonRpcMessage::Response(resp) => {
                if let Some(id) = resp.request_id().cloned() {
                    if let Some((_, tx)) = self.waiters.remove(&id) {
                        let _ = tx.send(resp);
                        return;
                    }
                }
                tracing::debug!("received response with no matching waiter");
            }
            other => {
                if let Some(handler) = self.inbound_handler.read().clone() {
                    handler(other);
                }
            }
        }
    }

    /// Send a request and await its correlated response. The assigned
    /// request id is also injected as `params._meta.progressToken`, so the
    /// peer can correlate `notifications/progress` updates back to it.
    pub async fn request(&self, method: impl Into<String>, params: Option<Value>) -> Result<JsonRpcResponse> {
        let id = self.id_gen.next_id();
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id.clone(), tx);

        let params = inject_progress_token(params, &id);
        let req = JsonRpcRequest::new(method, params, id.clone());
        let raw = serde_json::to_string(&req).map_err(|e| Error::Encode(e.to_string()))?;
        if let Err(e) = self.transport.send_frame(raw).await {
            self.waiters.remove(&id);
            return Err(Error::Transport(e));
        }

        rx.await.map_err(|_| Error::Cancelled)
    }

    pub async fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<()> {
        let note = JsonRpcNotification::new(method, params);
        let raw = serde_json::to_string(&note).map_err(|e| Error::Encode(e.to_string()))?;
        self.transport
            .send_frame(raw)
            .await
            .map_err(Error::Transport)
    }
}

/// Sets `params._meta.progressToken = id`, turning non-object or absent
/// `params` into an object first so the token always has somewhere to go.
fn inject_progress_token(params: Option<Value>, id: &RequestId) -> Option<Value> {
    let token = match id {
        RequestId::Number(n) => json!(*n),
        RequestId::String(s) => json!(s),
    };
    let mut map = match params {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
        None => serde_json::Map::new(),
    };
    match map.entry("_meta").or_insert_with(|| json!({})) {
        Value::Object(meta) => {
            meta.insert("progressToken".to_string(), token);
        }
        other => {
            *other = json!({ "progressToken": token });
        }
    }
    Some(Value::Object(map))
}
