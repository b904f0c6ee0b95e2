//! JSON-RPC 2.0 envelope types.
//!
//! Mirrors the wire shape required by §6 of the runtime spec: requests carry
//! `id` and `method`, responses carry `id` and exactly one of `result`/
//! `error`, notifications carry `method` without `id`. Unknown fields are
//! rejected by the per-version validators in [`crate::validation`], not here
//! — this module only knows the envelope shape, not MCP method semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request or response identifier.
///
/// MCP allows both numeric and string ids; batching is not supported by this
/// runtime (the spec's wire framing is strictly request/response/notification,
/// one envelope per frame).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A JSON-RPC version marker that only (de)serializes as the literal `"2.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonRpcVersionTag;

impl Serialize for JsonRpcVersionTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersionTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == JSONRPC_VERSION {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!(
                "invalid jsonrpc version: expected \"{JSONRPC_VERSION}\", got \"{s}\""
            )))
        }
    }
}

/// A JSON-RPC request envelope (has `id` and `method`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersionTag,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JsonRpcVersionTag,
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC notification envelope (has `method`, no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersionTag,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersionTag,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard + MCP-specific JSON-RPC error codes (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    AuthorizationFailed,
    ResourceNotFound,
    Application(i32),
}

impl JsonRpcErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            // MCP-specific stable codes, chosen in the implementation-defined
            // range reserved for server errors (-32000..-32099).
            Self::AuthorizationFailed => -32001,
            Self::ResourceNotFound => -32002,
            Self::Application(c) => c,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::AuthorizationFailed => "Authorization failed",
            Self::ResourceNotFound => "Resource not found",
            Self::Application(_) => "Application error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

impl From<JsonRpcErrorCode> for JsonRpcError {
    fn from(code: JsonRpcErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data: None,
        }
    }
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Response identifier: `None` only for parse errors, which have no
/// recoverable request id (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

impl ResponseId {
    pub fn from_request(id: RequestId) -> Self {
        Self(Some(id))
    }

    pub fn null() -> Self {
        Self(None)
    }

    pub fn as_request_id(&self) -> Option<&RequestId> {
        self.0.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }
}

/// Response payload: exactly one of `result`/`error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcError },
}

/// A JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersionTag,
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    pub id: ResponseId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersionTag,
            payload: JsonRpcResponsePayload::Success { result },
            id: ResponseId::from_request(id),
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersionTag,
            payload: JsonRpcResponsePayload::Error { error },
            id: ResponseId::from_request(id),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JsonRpcVersionTag,
            payload: JsonRpcResponsePayload::Error {
                error: JsonRpcError::new(JsonRpcErrorCode::ParseError, message),
            },
            id: ResponseId::null(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Error { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            JsonRpcResponsePayload::Success { result } => Some(result),
            JsonRpcResponsePayload::Error { .. } => None,
        }
    }

    pub fn error_ref(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            JsonRpcResponsePayload::Success { .. } => None,
            JsonRpcResponsePayload::Error { error } => Some(error),
        }
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.id.as_request_id()
    }
}

/// Union of the three envelope kinds a transport frame may carry.
///
/// Responses are distinguished from requests by the presence of `result`/
/// `error` rather than `method`; `serde(untagged)` tries request first so a
/// malformed envelope with both `method` and `result` is treated as a
/// request (methods take precedence, matching the teacher's parser which
/// checks for `method` before falling back to response parsing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_round_trips() {
        let req = JsonRpcRequest::new("ping", Some(json!({})), RequestId::Number(42));
        let s = serde_json::to_string(&req).unwrap();
        let back: JsonRpcRequest = serde_json::from_str(&s).unwrap();
        assert_eq!(back.method, "ping");
        assert_eq!(back.id, RequestId::Number(42));
    }

    #[test]
    fn response_success_shape() {
        let resp = JsonRpcResponse::success(RequestId::Number(42), json!({}));
        let v: Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 42);
        assert!(v.get("result").is_some());
        assert!(v.get("error").is_none());
    }

    #[test]
    fn parse_error_has_null_id() {
        let resp = JsonRpcResponse::parse_error("bad json");
        assert!(resp.is_error());
        assert!(resp.id.is_null());
        let v: Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["id"], Value::Null);
    }

    #[test]
    fn notification_has_no_id_field() {
        let note = JsonRpcNotification::new("notifications/initialized", None);
        let v: Value = serde_json::to_value(&note).unwrap();
        assert!(v.get("id").is_none());
    }

    #[test]
    fn error_codes_match_spec_table() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
    }

    // Seed scenario S3: ping never recorded, replies immediately with {}.
    #[test]
    fn s3_ping_round_trip() {
        let req = JsonRpcRequest::new("ping", Some(json!({})), RequestId::Number(42));
        assert_eq!(req.method, "ping");
        let resp = JsonRpcResponse::success(RequestId::Number(42), json!({}));
        assert_eq!(resp.result(), Some(&json!({})));
    }

    // Seed scenario S4: unknown method.
    #[test]
    fn s4_unknown_method_error() {
        let err = JsonRpcError::new(JsonRpcErrorCode::MethodNotFound, "Unknown request: foo/bar");
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Unknown request: foo/bar");
    }

    #[test]
    fn message_union_parses_request_and_response() {
        let req_json = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        match JsonRpcMessage::parse(req_json).unwrap() {
            JsonRpcMessage::Request(r) => assert_eq!(r.method, "ping"),
            other => panic!("expected request, got {other:?}"),
        }

        let resp_json = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        match JsonRpcMessage::parse(resp_json).unwrap() {
            JsonRpcMessage::Response(r) => assert!(r.is_success()),
            other => panic!("expected response, got {other:?}"),
        }

        let note_json = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        match JsonRpcMessage::parse(note_json).unwrap() {
            JsonRpcMessage::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
            other => panic!("expected notification, got {other:?}"),
        }
    }
}
