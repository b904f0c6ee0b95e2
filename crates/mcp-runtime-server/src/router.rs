//! Fixed method dispatch table (spec §4.2 `handleMessage`).
//!
//! Grounded on `turbomcp-server/src/router.rs`'s `route_request`: validate
//! the envelope, negotiate/validate `initialize` specially, then dispatch
//! every other method to a handler callback and wrap the result as a
//! JSON-RPC response. Differs from the teacher in dispatching to our own
//! async [`McpHandler`] trait instead of `turbomcp_core::handler::McpHandler`,
//! and in recording every inbound/outbound message to the session's event
//! log for resumability.

use crate::config::ServerConfig;
use crate::context::{ConnectionContext, RequestContext};
use crate::handler::McpHandler;
use crate::lifecycle::SessionManager;
use mcp_runtime_protocol::jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};
use mcp_runtime_protocol::validation;
use mcp_runtime_protocol::Error as ProtoError;
use mcp_runtime_session::{Session, SubscriptionIndex};
use serde_json::{json, Value};
use std::sync::Arc;

/// Route one inbound envelope to its handler and, for requests, produce the
/// reply envelope. Notifications and server-bound responses (replies to a
/// server-initiated request) return `None` — they are recorded but not
/// replied to.
pub async fn handle_message(
    handler: &dyn McpHandler,
    session: &Session,
    subscriptions: &SubscriptionIndex,
    config: &ServerConfig,
    envelope: JsonRpcMessage,
) -> Option<JsonRpcMessage> {
    match envelope {
        JsonRpcMessage::Request(req) => {
            let response_to = Some(req.id.clone());
            let _ = session
                .record_client_message(
                    JsonRpcMessage::Request(req.clone()),
                    None,
                )
                .await;
            let response = handle_request(handler, session, subscriptions, config, req).await;
            let _ = session
                .reply(JsonRpcMessage::Response(response.clone()), response_to)
                .await;
            Some(JsonRpcMessage::Response(response))
        }
        JsonRpcMessage::Notification(note) => {
            let _ = session
                .record_client_message(JsonRpcMessage::Notification(note.clone()), None)
                .await;
            handle_notification(session, note).await;
            None
        }
        JsonRpcMessage::Response(resp) => {
            // A client's reply to a server-initiated request (sampling,
            // elicitation, ...); correlate and deliver, no reply of our own.
            if let Some(id) = resp.request_id().cloned() {
                let _ = session
                    .record_client_message(
                        JsonRpcMessage::Response(resp.clone()),
                        Some(id.clone()),
                    )
                    .await;
                session.complete_request(&id, resp);
            }
            None
        }
    }
}

async fn handle_request(
    handler: &dyn McpHandler,
    session: &Session,
    subscriptions: &SubscriptionIndex,
    config: &ServerConfig,
    req: JsonRpcRequest,
) -> JsonRpcResponse {
    if let Some(params) = &req.params {
        if params.to_string().len() > config.max_message_size {
            return error_response(
                req.id,
                JsonRpcErrorCode::InvalidRequest,
                format!(
                    "request params exceed maximum message size of {} bytes",
                    config.max_message_size
                ),
            );
        }
    }

    if let Err(e) = validation::validate_params(&req.method, req.params.as_ref()) {
        return error_response(req.id, JsonRpcErrorCode::InvalidParams, e.to_string());
    }

    let ctx = RequestContext::new(session.id().clone(), session_user_id(session).await);
    let token = session.begin_inbound(req.id.clone());
    let result = dispatch(handler, session, subscriptions, &req, &ctx).await;
    session.end_inbound(&req.id);
    if token.is_cancelled() {
        return error_response(
            req.id,
            JsonRpcErrorCode::Application(-32800),
            "request cancelled".to_string(),
        );
    }

    match result {
        Ok(value) => JsonRpcResponse::success(req.id, value),
        Err(err) => JsonRpcResponse::error(req.id, err.to_jsonrpc()),
    }
}

async fn session_user_id(session: &Session) -> Option<String> {
    session.data().await.ok().and_then(|d| d.user_id)
}

async fn dispatch(
    handler: &dyn McpHandler,
    session: &Session,
    subscriptions: &SubscriptionIndex,
    req: &JsonRpcRequest,
    ctx: &RequestContext,
) -> mcp_runtime_protocol::Result<Value> {
    let params = req.params.clone().unwrap_or(Value::Null);
    match req.method.as_str() {
        "ping" => Ok(json!({})),

        "initialize" => {
            let data = session
                .data()
                .await
                .map_err(|e| ProtoError::Internal(e.to_string()))?;
            Ok(json!({
                "protocolVersion": data.protocol_version.as_str(),
                "serverInfo": handler.server_info(),
                "capabilities": handler.server_capabilities(),
            }))
        }

        "tools/list" => {
            let tools = handler.list_tools(ctx).await?;
            Ok(json!({"tools": tools.into_iter().map(|t| t.descriptor).collect::<Vec<_>>()}))
        }
        "tools/call" => {
            let name = require_str(&params, "name")?;
            let arguments = params.get("arguments").cloned();
            handler.call_tool(name, arguments, ctx).await
        }

        "resources/list" => {
            let resources = handler.list_resources(ctx).await?;
            Ok(json!({"resources": resources.into_iter().map(|r| r.descriptor).collect::<Vec<_>>()}))
        }
        "resources/templates/list" => {
            let templates = handler.list_resource_templates(ctx).await?;
            Ok(json!({"resourceTemplates": templates.into_iter().map(|r| r.descriptor).collect::<Vec<_>>()}))
        }
        "resources/read" => {
            let uri = require_str(&params, "uri")?;
            handler.read_resource(uri, ctx).await
        }
        "resources/subscribe" => {
            let uri = require_str(&params, "uri")?.to_string();
            if !handler.resource_exists(&uri, ctx).await? {
                return Err(ProtoError::InvalidParams(format!("no such resource: {uri}")));
            }
            subscriptions.subscribe(uri.clone(), session.id().clone());
            let mut data = session
                .data()
                .await
                .map_err(|e| ProtoError::Internal(e.to_string()))?;
            data.subscriptions.insert(uri);
            session
                .update_data(data)
                .await
                .map_err(|e| ProtoError::Internal(e.to_string()))?;
            Ok(json!({}))
        }
        "resources/unsubscribe" => {
            let uri = require_str(&params, "uri")?.to_string();
            subscriptions.unsubscribe(&uri, session.id());
            let mut data = session
                .data()
                .await
                .map_err(|e| ProtoError::Internal(e.to_string()))?;
            data.subscriptions.remove(&uri);
            session
                .update_data(data)
                .await
                .map_err(|e| ProtoError::Internal(e.to_string()))?;
            Ok(json!({}))
        }

        "prompts/list" => {
            let prompts = handler.list_prompts(ctx).await?;
            Ok(json!({"prompts": prompts.into_iter().map(|p| p.descriptor).collect::<Vec<_>>()}))
        }
        "prompts/get" => {
            let name = require_str(&params, "name")?;
            let arguments = params.get("arguments").cloned();
            handler.get_prompt(name, arguments, ctx).await
        }

        "completion/complete" => handler.complete(params, ctx).await,

        "logging/setLevel" => {
            let level = require_str(&params, "level")?;
            handler.set_log_level(level, ctx).await?;
            Ok(json!({}))
        }

        other => Err(ProtoError::MethodNotFound(format!(
            "Unknown request: {other}"
        ))),
    }
}

async fn handle_notification(session: &Session, note: JsonRpcNotification) {
    match note.method.as_str() {
        "notifications/initialized" => {
            tracing::debug!(session = %session.id(), "client signaled initialized");
        }
        "notifications/cancelled" => {
            if let Some(params) = &note.params {
                if let Some(raw_id) = params.get("requestId") {
                    if let Some(id) = parse_request_id(raw_id) {
                        session.cancel_inbound(&id);
                    }
                }
            }
        }
        other => {
            tracing::debug!(session = %session.id(), method = other, "unhandled notification");
        }
    }
}

fn parse_request_id(v: &Value) -> Option<RequestId> {
    if let Some(n) = v.as_i64() {
        Some(RequestId::Number(n))
    } else {
        v.as_str().map(|s| RequestId::String(s.to_string()))
    }
}

fn require_str<'a>(params: &'a Value, field: &str) -> mcp_runtime_protocol::Result<&'a str> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProtoError::InvalidParams(format!("missing required field: {field}")))
}

fn error_response(id: RequestId, code: JsonRpcErrorCode, message: String) -> JsonRpcResponse {
    JsonRpcResponse::error(id, JsonRpcError::new(code, message))
}

/// Shared router state, bundling a handler with its session-independent
/// configuration. Most deployments construct one of these and call
/// [`Router::handle_message`] per inbound envelope.
pub struct Router {
    pub handler: Arc<dyn McpHandler>,
    pub config: ServerConfig,
}

impl Router {
    pub fn new(handler: Arc<dyn McpHandler>, config: ServerConfig) -> Self {
        Self { handler, config }
    }

    pub async fn handle_message(
        &self,
        session: &Session,
        subscriptions: &SubscriptionIndex,
        envelope: JsonRpcMessage,
    ) -> Option<JsonRpcMessage> {
        handle_message(
            self.handler.as_ref(),
            session,
            subscriptions,
            &self.config,
            envelope,
        )
        .await
    }

    /// The full `handleMessage(envelope, connectionContext)` contract
    /// (spec §4.2): resolve and resume `ctx.session_id` (spec §4.3) before
    /// dispatching the envelope. Notifications/responses for a session that
    /// fails to resume are logged and dropped; a request gets back a JSON-RPC
    /// error envelope built from the resume failure (e.g. `RESOURCE_NOT_FOUND`
    /// for an unknown session, `AUTHORIZATION_FAILED` for a `userId`
    /// mismatch).
    pub async fn handle_message_resuming(
        &self,
        manager: &SessionManager,
        ctx: ConnectionContext,
        envelope: JsonRpcMessage,
    ) -> Option<JsonRpcMessage> {
        let resumed = manager
            .resume(
                &ctx.session_id,
                ctx.user_id.as_deref(),
                ctx.after,
                ctx.channel_id,
                ctx.channel,
            )
            .await;
        let session = match resumed {
            Ok(session) => session,
            Err(err) => {
                return match envelope {
                    JsonRpcMessage::Request(req) => Some(JsonRpcMessage::Response(
                        JsonRpcResponse::error(req.id, err.to_jsonrpc()),
                    )),
                    _ => {
                        tracing::warn!(
                            session = %ctx.session_id,
                            error = %err,
                            "failed to resume session for inbound envelope"
                        );
                        None
                    }
                };
            }
        };
        self.handle_message(&session, &manager.subscriptions, envelope)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EmptyHandler;
    use mcp_runtime_protocol::jsonrpc::RequestId;
    use mcp_runtime_session::{
        Capabilities, ImplementationInfo, MemorySessionStore, SessionData, SessionId, SessionStore,
    };
    use mcp_runtime_protocol::ProtocolVersion;

    async fn new_session() -> Session {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let data = SessionData::new(
            ProtocolVersion::negotiate(Some("2025-03-26")),
            ImplementationInfo::default(),
            Capabilities::default(),
            ImplementationInfo::default(),
            Capabilities::default(),
        );
        Session::initialize(SessionId::generate(), store, data)
            .await
            .unwrap()
    }

    // Seed scenario S2: initialize round trip.
    #[tokio::test]
    async fn s2_initialize_returns_negotiated_version_and_server_info() {
        let handler = EmptyHandler::new("demo-server", "1.0.0");
        let session = new_session().await;
        let subs = SubscriptionIndex::new();
        let config = ServerConfig::default();

        let req = JsonRpcMessage::Request(JsonRpcRequest::new(
            "initialize",
            Some(json!({
                "protocolVersion": "2025-03-26",
                "clientInfo": {"name": "demo-client", "version": "0.1.0"},
                "capabilities": {}
            })),
            RequestId::Number(1),
        ));

        let resp = handle_message(&handler, &session, &subs, &config, req)
            .await
            .unwrap();
        match resp {
            JsonRpcMessage::Response(r) => {
                assert!(r.is_success());
                let result = r.result().unwrap();
                assert_eq!(result["protocolVersion"], "2025-03-26");
                assert_eq!(result["serverInfo"]["name"], "demo-server");
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ping_round_trips_empty_result() {
        let handler = EmptyHandler::new("demo", "1.0.0");
        let session = new_session().await;
        let subs = SubscriptionIndex::new();
        let config = ServerConfig::default();

        let req = JsonRpcMessage::Request(JsonRpcRequest::new(
            "ping",
            None,
            RequestId::Number(7),
        ));
        let resp = handle_message(&handler, &session, &subs, &config, req)
            .await
            .unwrap();
        match resp {
            JsonRpcMessage::Response(r) => assert_eq!(r.result(), Some(&json!({}))),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_method_returns_method_not_found() {
        let handler = EmptyHandler::new("demo", "1.0.0");
        let session = new_session().await;
        let subs = SubscriptionIndex::new();
        let config = ServerConfig::default();

        let req = JsonRpcMessage::Request(JsonRpcRequest::new(
            "foo/bar",
            None,
            RequestId::Number(1),
        ));
        let resp = handle_message(&handler, &session, &subs, &config, req)
            .await
            .unwrap();
        match resp {
            JsonRpcMessage::Response(r) => {
                assert!(r.is_error());
                assert_eq!(r.error_ref().unwrap().code, -32601);
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn notification_yields_no_response() {
        let handler = EmptyHandler::new("demo", "1.0.0");
        let session = new_session().await;
        let subs = SubscriptionIndex::new();
        let config = ServerConfig::default();

        let note = JsonRpcMessage::Notification(JsonRpcNotification::new(
            "notifications/initialized",
            None,
        ));
        assert!(handle_message(&handler, &session, &subs, &config, note)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn handle_message_resuming_dispatches_after_resolving_session() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store, std::time::Duration::from_secs(3600), std::time::Duration::from_secs(3600));
        let session = manager
            .initialize_session(
                Some("2025-03-26"),
                ImplementationInfo::default(),
                Capabilities::default(),
                ImplementationInfo::default(),
                Capabilities::default(),
                None,
            )
            .await
            .unwrap();
        let id = session.id().clone();

        let handler: Arc<dyn McpHandler> = Arc::new(EmptyHandler::new("demo", "1.0.0"));
        let router = Router::new(handler, ServerConfig::default());

        struct NoopChannel;
        #[async_trait::async_trait]
        impl mcp_runtime_session::Channel for NoopChannel {
            async fn push(
                &self,
                _event: &mcp_runtime_session::Event,
            ) -> std::result::Result<(), mcp_runtime_session::ChannelClosed> {
                Ok(())
            }
        }

        let ctx = ConnectionContext {
            session_id: id,
            channel_id: mcp_runtime_session::ChannelId("c1".into()),
            channel: Arc::new(NoopChannel),
            after: None,
            user_id: None,
        };
        let req = JsonRpcMessage::Request(JsonRpcRequest::new("ping", None, RequestId::Number(1)));
        let resp = router
            .handle_message_resuming(&manager, ctx, req)
            .await
            .unwrap();
        match resp {
            JsonRpcMessage::Response(r) => assert_eq!(r.result(), Some(&json!({}))),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handle_message_resuming_unknown_session_yields_resource_not_found() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store, std::time::Duration::from_secs(3600), std::time::Duration::from_secs(3600));
        let handler: Arc<dyn McpHandler> = Arc::new(EmptyHandler::new("demo", "1.0.0"));
        let router = Router::new(handler, ServerConfig::default());

        struct NoopChannel;
        #[async_trait::async_trait]
        impl mcp_runtime_session::Channel for NoopChannel {
            async fn push(
                &self,
                _event: &mcp_runtime_session::Event,
            ) -> std::result::Result<(), mcp_runtime_session::ChannelClosed> {
                Ok(())
            }
        }

        let ctx = ConnectionContext {
            session_id: SessionId::generate(),
            channel_id: mcp_runtime_session::ChannelId("c1".into()),
            channel: Arc::new(NoopChannel),
            after: None,
            user_id: None,
        };
        let req = JsonRpcMessage::Request(JsonRpcRequest::new("ping", None, RequestId::Number(1)));
        let resp = router
            .handle_message_resuming(&manager, ctx, req)
            .await
            .unwrap();
        match resp {
            JsonRpcMessage::Response(r) => {
                assert!(r.is_error());
                assert_eq!(
                    r.error_ref().unwrap().code,
                    mcp_runtime_protocol::jsonrpc::JsonRpcErrorCode::ResourceNotFound.code()
                );
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_updates_index_and_session_data() {
        let handler = EmptyHandler::new("demo", "1.0.0");
        let session = new_session().await;
        let subs = SubscriptionIndex::new();
        let config = ServerConfig::default();

        // resources_exists defaults to checking list_resources, which is
        // empty, so subscribe against an unknown uri is rejected.
        let req = JsonRpcMessage::Request(JsonRpcRequest::new(
            "resources/subscribe",
            Some(json!({"uri": "file:///a.txt"})),
            RequestId::Number(1),
        ));
        let resp = handle_message(&handler, &session, &subs, &config, req)
            .await
            .unwrap();
        match resp {
            JsonRpcMessage::Response(r) => assert!(r.is_error()),
            other => panic!("expected response, got {other:?}"),
        }
    }
}
