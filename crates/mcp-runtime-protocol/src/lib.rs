//! JSON-RPC 2.0 envelopes, MCP protocol version negotiation, error codes and
//! per-version request validators.
//!
//! This crate is the schema layer shared by the session engine, the server
//! router and the client connector: it knows nothing about sessions,
//! transports or handlers, only about the wire shape of MCP messages.

pub mod correlation;
pub mod error;
pub mod jsonrpc;
pub mod validation;
pub mod version;

pub use correlation::{CancellationToken, IdGenerator, PendingRequest};
pub use error::{Error, Result};
pub use jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcResponsePayload, RequestId, ResponseId, JSONRPC_VERSION,
};
pub use version::{ProtocolVersion, SUPPORTED_VERSIONS};
