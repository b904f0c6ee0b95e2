//! Error taxonomy for the protocol crate (spec §7).
//!
//! Protocol errors are always representable as a JSON-RPC error envelope;
//! this type exists for the cases where Rust call sites want a `Result`
//! before an envelope is constructed (e.g. a validator rejecting a message
//! before we know which request id to attach the error to).

use crate::jsonrpc::{JsonRpcError, JsonRpcErrorCode};
use uuid::Uuid;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol-layer error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),
}

impl Error {
    /// Unique id for this error occurrence, useful for correlating a log
    /// line with the error envelope a client receives.
    pub fn instance_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Project this error onto a JSON-RPC error object per the code table
    /// in spec §6.
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        let (code, msg) = match self {
            Self::Parse(m) => (JsonRpcErrorCode::ParseError, m.clone()),
            Self::InvalidRequest(m) => (JsonRpcErrorCode::InvalidRequest, m.clone()),
            Self::MethodNotFound(m) => (JsonRpcErrorCode::MethodNotFound, m.clone()),
            Self::InvalidParams(m) => (JsonRpcErrorCode::InvalidParams, m.clone()),
            Self::Internal(m) => (JsonRpcErrorCode::InternalError, m.clone()),
            Self::AuthorizationFailed(m) => (JsonRpcErrorCode::AuthorizationFailed, m.clone()),
            Self::ResourceNotFound(m) => (JsonRpcErrorCode::ResourceNotFound, m.clone()),
        };
        JsonRpcError::new(code, msg)
    }
}
