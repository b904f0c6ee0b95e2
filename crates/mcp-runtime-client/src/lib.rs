//! The MCP client connector: transport-agnostic request/response
//! correlation, SSE ingest parsing, retry-with-backoff reconnection and a
//! TTL cache for list results (spec §4.5, §4.6, §4.7).

pub mod cache;
pub mod connector;
pub mod error;
pub mod retry;
pub mod sse;

pub use cache::ListCache;
pub use connector::{ConnectionState, Connector, DisconnectReason, InboundHandler, Transport};
pub use error::{Error, Result};
pub use retry::{retry_with_backoff, retry_with_backoff_classify, BackoffPolicy};
pub use sse::{SseDecoder, SseError, SseEvent};
