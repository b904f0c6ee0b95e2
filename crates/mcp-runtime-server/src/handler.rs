//! The pluggable handler trait (spec §9 design notes: "polymorphic handler
//! set").
//!
//! Grounded on `turbomcp_core::handler::McpHandler`: the router dispatches
//! fixed MCP methods to a small set of handler callbacks, and the handler
//! knows nothing about JSON-RPC envelopes, sessions, or transports.

use crate::context::RequestContext;
use mcp_runtime_protocol::{Error, Result};
use mcp_runtime_session::CatalogEntry;
use serde_json::Value;

/// Implemented once per MCP server deployment to supply tool/resource/
/// prompt catalogs and execute requests against them.
///
/// All methods are async to allow handlers to call out to databases,
/// subprocesses, or remote services. Defaults are provided for the optional
/// surface (resource templates, logging level, completion) so a minimal
/// handler only needs to implement the required five.
#[async_trait::async_trait]
pub trait McpHandler: Send + Sync {
    /// `serverInfo` echoed back in `initialize`'s result.
    fn server_info(&self) -> Value;

    /// `capabilities` echoed back in `initialize`'s result.
    fn server_capabilities(&self) -> Value;

    async fn list_tools(&self, ctx: &RequestContext) -> Result<Vec<CatalogEntry>>;
    async fn list_resources(&self, ctx: &RequestContext) -> Result<Vec<CatalogEntry>>;
    async fn list_prompts(&self, ctx: &RequestContext) -> Result<Vec<CatalogEntry>>;

    async fn call_tool(&self, name: &str, arguments: Option<Value>, ctx: &RequestContext) -> Result<Value>;
    async fn read_resource(&self, uri: &str, ctx: &RequestContext) -> Result<Value>;
    async fn get_prompt(&self, name: &str, arguments: Option<Value>, ctx: &RequestContext) -> Result<Value>;

    async fn list_resource_templates(&self, _ctx: &RequestContext) -> Result<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }

    async fn complete(&self, _params: Value, _ctx: &RequestContext) -> Result<Value> {
        Ok(serde_json::json!({"completion": {"values": [], "total": 0, "hasMore": false}}))
    }

    async fn set_log_level(&self, _level: &str, _ctx: &RequestContext) -> Result<()> {
        Ok(())
    }

    /// Whether `uri` names a resource this handler can serve, consulted by
    /// the router before admitting a `resources/subscribe` (spec §4.4).
    async fn resource_exists(&self, uri: &str, ctx: &RequestContext) -> Result<bool> {
        let resources = self.list_resources(ctx).await?;
        Ok(resources.iter().any(|r| r.descriptor.get("uri").and_then(|u| u.as_str()) == Some(uri)))
    }
}

/// A handler with empty catalogs and no callable tools/resources/prompts,
/// useful as a base for tests or a server that only exchanges `ping`/
/// `initialize`.
pub struct EmptyHandler {
    pub name: String,
    pub version: String,
}

impl EmptyHandler {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[async_trait::async_trait]
impl McpHandler for EmptyHandler {
    fn server_info(&self) -> Value {
        serde_json::json!({"name": self.name, "version": self.version})
    }

    fn server_capabilities(&self) -> Value {
        serde_json::json!({})
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> Result<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }

    async fn list_resources(&self, _ctx: &RequestContext) -> Result<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }

    async fn list_prompts(&self, _ctx: &RequestContext) -> Result<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, name: &str, _arguments: Option<Value>, _ctx: &RequestContext) -> Result<Value> {
        Err(Error::InvalidParams(format!("no such tool: {name}")))
    }

    async fn read_resource(&self, uri: &str, _ctx: &RequestContext) -> Result<Value> {
        Err(Error::InvalidParams(format!("no such resource: {uri}")))
    }

    async fn get_prompt(&self, name: &str, _arguments: Option<Value>, _ctx: &RequestContext) -> Result<Value> {
        Err(Error::InvalidParams(format!("no such prompt: {name}")))
    }
}
