//! OAuth proxy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which role this crate plays for a given deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperatingMode {
    /// Acts as its own authorization server: issues and validates its own
    /// tokens (DCR, authorize, token, introspect all served locally).
    Proxy,
    /// Defers to an external authorization server for token issuance;
    /// this crate only runs the resource-server gate, validating bearer
    /// tokens via RFC 7662 introspection against the external AS.
    ResourceServerOnly { introspection_endpoint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub mode: OperatingMode,
    /// This server's own canonical resource URI (RFC 8707 audience).
    pub resource: String,
    #[serde(default = "default_auth_code_ttl")]
    pub authorization_code_ttl: Duration,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: Duration,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: Duration,
    /// Secret used to sign the short-lived JWT that carries proxy state
    /// through the authorize -> upstream -> callback round trip.
    pub state_signing_key: Vec<u8>,
    #[serde(default = "default_introspection_cache_ttl")]
    pub introspection_cache_ttl: Duration,
}

fn default_auth_code_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_access_token_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_refresh_token_ttl() -> Duration {
    Duration::from_secs(30 * 24 * 3600)
}

fn default_introspection_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

impl OAuthConfig {
    pub fn proxy(resource: String, state_signing_key: Vec<u8>) -> Self {
        Self {
            mode: OperatingMode::Proxy,
            resource,
            authorization_code_ttl: default_auth_code_ttl(),
            access_token_ttl: default_access_token_ttl(),
            refresh_token_ttl: default_refresh_token_ttl(),
            state_signing_key,
            introspection_cache_ttl: default_introspection_cache_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_constructor_fills_in_defaults() {
        let cfg = OAuthConfig::proxy("https://mcp.example.com/mcp".to_string(), vec![0u8; 32]);
        assert_eq!(cfg.mode, OperatingMode::Proxy);
        assert_eq!(cfg.access_token_ttl, Duration::from_secs(3600));
    }
}
