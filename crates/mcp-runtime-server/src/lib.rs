//! The MCP protocol router, session lifecycle manager, and subscription
//! fan-out engine (spec §4.2, §4.3, §4.4).
//!
//! Built on top of `mcp-runtime-session` (the durable session/event log)
//! and `mcp-runtime-protocol` (the wire schema); this crate is the part
//! that actually dispatches MCP methods to a deployment-supplied
//! [`McpHandler`].

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod notify;
pub mod router;

pub use config::ServerConfig;
pub use context::{ConnectionContext, RequestContext};
pub use error::{Error, Result};
pub use handler::{EmptyHandler, McpHandler};
pub use lifecycle::SessionManager;
pub use notify::{notify_list_changed, notify_resource_updated, ListKind};
pub use router::{handle_message, Router};
