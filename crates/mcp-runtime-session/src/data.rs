//! Persisted session attributes (spec §3 "SessionData").

use mcp_runtime_protocol::version::ProtocolVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Free-form identity/implementation info exchanged during `initialize`.
/// Kept as an opaque JSON object: the runtime does not interpret `name`/
/// `version`/`title` fields, it only stores and echoes them back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplementationInfo(pub Value);

/// The capability sets negotiated during `initialize`. Left as opaque JSON —
/// capability *semantics* belong to the handler layer (spec §4.9), the
/// session engine only needs to remember what was agreed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities(pub Value);

/// A named, opaque catalog entry (tool, prompt, resource, or resource
/// template) as last advertised to this session. Stored verbatim so
/// `resources/list`-style responses can be served from memory without
/// recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub descriptor: Value,
}

/// The durable attributes of a session: everything that must survive a
/// disconnect/reconnect cycle, independent of which transport channel (if
/// any) is currently attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Identity of the authenticated principal that opened this session, if
    /// the deployment has authentication enabled (spec §4.9).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub protocol_version: ProtocolVersion,
    pub client_info: ImplementationInfo,
    pub server_info: ImplementationInfo,
    pub client_capabilities: Capabilities,
    pub server_capabilities: Capabilities,
    pub tools: Vec<CatalogEntry>,
    pub prompts: Vec<CatalogEntry>,
    pub resources: Vec<CatalogEntry>,
    pub resource_templates: Vec<CatalogEntry>,
    /// Resource URIs this session has subscribed to via
    /// `resources/subscribe`.
    pub subscriptions: HashSet<String>,
}

impl SessionData {
    pub fn new(
        protocol_version: ProtocolVersion,
        client_info: ImplementationInfo,
        client_capabilities: Capabilities,
        server_info: ImplementationInfo,
        server_capabilities: Capabilities,
    ) -> Self {
        Self {
            user_id: None,
            protocol_version,
            client_info,
            server_info,
            client_capabilities,
            server_capabilities,
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            resource_templates: Vec::new(),
            subscriptions: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_data_has_empty_catalogs() {
        let data = SessionData::new(
            ProtocolVersion::latest(),
            ImplementationInfo::default(),
            Capabilities::default(),
            ImplementationInfo::default(),
            Capabilities::default(),
        );
        assert!(data.tools.is_empty());
        assert!(data.subscriptions.is_empty());
        assert!(data.user_id.is_none());
    }
}
