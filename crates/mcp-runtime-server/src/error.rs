//! Server-level errors: failures that originate above the protocol/session
//! layers (lifecycle management, notification fan-out).

use mcp_runtime_protocol::jsonrpc::JsonRpcError;
use mcp_runtime_protocol::Error as ProtoError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] mcp_runtime_session::Error),

    #[error(transparent)]
    Protocol(#[from] mcp_runtime_protocol::Error),
}

impl Error {
    /// Project this error onto a JSON-RPC error envelope, the same way
    /// `mcp_runtime_protocol::Error::to_jsonrpc` does for protocol errors
    /// (spec §7).
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        match self {
            Self::Session(e) => session_error_to_proto(e).to_jsonrpc(),
            Self::Protocol(e) => e.to_jsonrpc(),
        }
    }
}

fn session_error_to_proto(e: &mcp_runtime_session::Error) -> ProtoError {
    match e {
        mcp_runtime_session::Error::NotFound(id) => {
            ProtoError::ResourceNotFound(format!("session not found: {id}"))
        }
        mcp_runtime_session::Error::Terminated(id) => {
            ProtoError::InvalidRequest(format!("session already terminated: {id}"))
        }
        mcp_runtime_session::Error::NoChannelAttached(id) => {
            ProtoError::InvalidRequest(format!("no channel attached to session: {id}"))
        }
        mcp_runtime_session::Error::EventNotFound { session, .. } => ProtoError::ResourceNotFound(
            format!("event log gap for session: {session}"),
        ),
        mcp_runtime_session::Error::Store(msg) => ProtoError::Internal(msg.clone()),
    }
}
