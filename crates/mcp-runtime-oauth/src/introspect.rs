//! RFC 7662 token introspection and revocation.
//!
//! Two roles live here, mirroring `turbomcp-auth/src/introspection.rs`'s
//! `IntrospectionClient`: [`introspect_local`]/[`revoke_local`] serve
//! `/introspect` and `/revoke` for tokens this proxy minted itself, and
//! [`IntrospectionClient`] is the outbound counterpart used by
//! [`crate::gate`] when running in resource-server-only mode against
//! someone else's authorization server — redacting the token from its
//! `Debug` impl exactly as the teacher does, since it otherwise would
//! end up in request-tracing logs.

use std::time::Duration;

use crate::store::ProxyStore;
use crate::types::{IntrospectRequest, IntrospectResponse, RevokeRequest};

pub fn introspect_local(store: &ProxyStore, req: IntrospectRequest) -> IntrospectResponse {
    let hint_is_refresh = req.token_type_hint.as_deref() == Some("refresh_token");

    let found = if hint_is_refresh {
        None
    } else {
        store.access_token(&req.token)
    };

    match found {
        Some(entry) => IntrospectResponse {
            active: true,
            scope: entry.scope,
            client_id: Some(entry.client_id),
            exp: None,
            aud: Some(entry.resource),
            additional: Default::default(),
        },
        None => IntrospectResponse {
            active: false,
            ..Default::default()
        },
    }
}

pub fn revoke_local(store: &ProxyStore, req: RevokeRequest) {
    match req.token_type_hint.as_deref() {
        Some("refresh_token") => store.revoke_refresh_token(&req.token),
        _ => {
            store.revoke_access_token(&req.token);
            store.revoke_refresh_token(&req.token);
        }
    }
}

/// Outbound introspection client for resource-server-only mode, where an
/// external authorization server is the source of truth for token state.
#[derive(Clone)]
pub struct IntrospectionClient {
    endpoint: String,
    client_id: String,
    client_secret: Option<String>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for IntrospectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrospectionClient")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("http_client", &"<reqwest::Client>")
            .finish()
    }
}

impl IntrospectionClient {
    pub fn new(endpoint: String, client_id: String, client_secret: Option<String>) -> Self {
        Self {
            endpoint,
            client_id,
            client_secret,
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn introspect(
        &self,
        token: &str,
        token_type_hint: Option<&str>,
    ) -> crate::error::Result<IntrospectResponse> {
        let mut form = vec![("token", token.to_string())];
        if let Some(hint) = token_type_hint {
            form.push(("token_type_hint", hint.to_string()));
        }

        let mut request = self.http_client.post(&self.endpoint).form(&form);
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| crate::error::Error::UpstreamError(format!("introspection request failed: {e}")))?;

        response
            .json::<IntrospectResponse>()
            .await
            .map_err(|e| crate::error::Error::UpstreamError(format!("invalid introspection response: {e}")))
    }

    pub async fn is_token_active(&self, token: &str) -> crate::error::Result<bool> {
        Ok(self.introspect(token, Some("access_token")).await?.active)
    }
}

/// TTL cache in front of [`IntrospectionClient::introspect`], so every
/// gated request doesn't round-trip to the upstream AS. Reuses the same
/// hand-rolled, single-shape cache as `mcp-runtime-client::cache::ListCache`
/// rather than pulling in `moka` a second time for an identical shape.
pub struct CachedIntrospection {
    client: IntrospectionClient,
    cache: mcp_runtime_client::ListCache,
}

impl CachedIntrospection {
    pub fn new(client: IntrospectionClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: mcp_runtime_client::ListCache::new(ttl),
        }
    }

    pub async fn introspect(&self, token: &str) -> crate::error::Result<IntrospectResponse> {
        let cache_key = format!("introspect:{token}");
        if let Some(cached) = self.cache.get(&cache_key) {
            return serde_json::from_value(cached)
                .map_err(|e| crate::error::Error::UpstreamError(format!("cached introspection decode failed: {e}")));
        }

        let response = self.client.introspect(token, Some("access_token")).await?;
        let value = serde_json::to_value(&response)
            .map_err(|e| crate::error::Error::UpstreamError(format!("introspection encode failed: {e}")))?;
        self.cache.put(cache_key, value);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IssuedToken, RegisteredClient};

    #[test]
    fn introspect_local_reports_active_for_a_live_token() {
        let store = ProxyStore::new();
        store.register_client(RegisteredClient {
            client_id: "client-1".to_string(),
            client_secret_digest: None,
            redirect_uris: vec![],
            grant_types: vec![],
            token_endpoint_auth_method: "none".to_string(),
        });
        store.put_access_token(
            "token-1",
            IssuedToken {
                client_id: "client-1".to_string(),
                resource: "https://mcp.example.com/mcp".to_string(),
                scope: None,
                upstream_access_token: None,
            },
            Duration::from_secs(60),
        );

        let resp = introspect_local(
            &store,
            IntrospectRequest {
                token: "token-1".to_string(),
                token_type_hint: None,
            },
        );
        assert!(resp.active);
        assert_eq!(resp.client_id.as_deref(), Some("client-1"));
    }

    #[test]
    fn introspect_local_reports_inactive_for_unknown_token() {
        let store = ProxyStore::new();
        let resp = introspect_local(
            &store,
            IntrospectRequest {
                token: "does-not-exist".to_string(),
                token_type_hint: None,
            },
        );
        assert!(!resp.active);
    }

    #[test]
    fn revoke_local_deactivates_the_token() {
        let store = ProxyStore::new();
        store.put_access_token(
            "token-1",
            IssuedToken {
                client_id: "client-1".to_string(),
                resource: "https://mcp.example.com/mcp".to_string(),
                scope: None,
                upstream_access_token: None,
            },
            Duration::from_secs(60),
        );
        revoke_local(
            &store,
            RevokeRequest {
                token: "token-1".to_string(),
                token_type_hint: None,
            },
        );
        let resp = introspect_local(
            &store,
            IntrospectRequest {
                token: "token-1".to_string(),
                token_type_hint: None,
            },
        );
        assert!(!resp.active);
    }
}
