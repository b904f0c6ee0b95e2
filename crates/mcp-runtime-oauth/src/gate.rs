//! Resource-server gate: extracts and validates the bearer token on an
//! incoming request before it reaches the MCP router, binding it to the
//! expected resource per RFC 8707.

use http::HeaderMap;
use serde_json::Value;
use std::collections::HashSet;

use crate::config::OperatingMode;
use crate::error::{Error, Result};
use crate::introspect::{introspect_local, CachedIntrospection};
use crate::metadata::{unauthorized_response_body, WwwAuthenticateBuilder};
use crate::resource::resource_matches;
use crate::store::ProxyStore;
use crate::types::IntrospectRequest;

/// Identity established by a validated bearer token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub client_id: Option<String>,
    pub scope: Option<String>,
}

/// Path prefixes the gate never protects: OAuth endpoints themselves,
/// well-known discovery documents, health checks and management surfaces.
const EXEMPT_PREFIXES: &[&str] = &["/oauth/", "/.well-known/", "/health", "/management/"];

/// Whether `path` needs a bearer token at all.
pub fn path_requires_gating(path: &str) -> bool {
    !EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Whether `granted` (a space-delimited OAuth scope string) covers every
/// scope listed in `required` (also space-delimited). An empty `required`
/// is always satisfied.
fn scope_satisfies(granted: Option<&str>, required: &str) -> bool {
    let required: Vec<&str> = required.split_whitespace().collect();
    if required.is_empty() {
        return true;
    }
    let granted: HashSet<&str> = granted.map(|s| s.split_whitespace().collect()).unwrap_or_default();
    required.iter().all(|scope| granted.contains(scope))
}

/// Builds the `WWW-Authenticate` header value and JSON body for a 401 (or
/// 403, for [`Error::InsufficientScope`]) response to `err`, per RFC 9728
/// §5.1.
pub fn challenge_response(err: &Error, metadata_uri: &str, required_scopes: &str) -> (String, Value) {
    let scope = (!required_scopes.is_empty()).then(|| required_scopes.to_string());
    let mut builder = WwwAuthenticateBuilder::new(metadata_uri.to_string())
        .with_error(err.oauth_error_code().to_string(), Some(err.to_string()));
    if let Some(scope) = scope.clone() {
        builder = builder.with_scope(scope);
    }
    let header = builder.build();
    let body = unauthorized_response_body(metadata_uri, scope.as_deref());
    (header, body)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str> {
    let header = headers
        .get(http::header::AUTHORIZATION)
        .ok_or(Error::MissingBearerToken)?
        .to_str()
        .map_err(|_| Error::MissingBearerToken)?;

    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().ok_or(Error::MissingBearerToken)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::MissingBearerToken);
    }
    Ok(token)
}

/// Validate the bearer token on `headers` against the proxy's own token
/// store (local-issuer mode), and require it to carry every scope in
/// `required_scopes` (space-delimited; empty means no scope requirement).
pub fn gate_local(
    store: &ProxyStore,
    headers: &HeaderMap,
    expected_resource: &str,
    required_scopes: &str,
) -> Result<Principal> {
    let token = extract_bearer_token(headers)?;
    let response = introspect_local(
        store,
        IntrospectRequest {
            token: token.to_string(),
            token_type_hint: Some("access_token".to_string()),
        },
    );

    if !response.active {
        return Err(Error::InvalidToken);
    }

    let aud = response
        .aud
        .ok_or_else(|| Error::InvalidResource("token has no audience".to_string()))?;
    if !resource_matches(&aud, expected_resource) {
        return Err(Error::InvalidResource(
            "token audience does not match this resource".to_string(),
        ));
    }
    if !scope_satisfies(response.scope.as_deref(), required_scopes) {
        return Err(Error::InsufficientScope(required_scopes.to_string()));
    }

    Ok(Principal {
        client_id: response.client_id,
        scope: response.scope,
    })
}

/// Validate the bearer token on `headers` against an external
/// authorization server via cached RFC 7662 introspection
/// (resource-server-only mode), requiring every scope in
/// `required_scopes` (space-delimited; empty means no scope requirement).
pub async fn gate_external(
    introspection: &CachedIntrospection,
    headers: &HeaderMap,
    expected_resource: &str,
    required_scopes: &str,
) -> Result<Principal> {
    let token = extract_bearer_token(headers)?;
    let response = introspection.introspect(token).await?;

    if !response.active {
        return Err(Error::InvalidToken);
    }

    let aud = response
        .aud
        .ok_or_else(|| Error::InvalidResource("token has no audience".to_string()))?;
    if !resource_matches(&aud, expected_resource) {
        return Err(Error::InvalidResource(
            "token audience does not match this resource".to_string(),
        ));
    }
    if !scope_satisfies(response.scope.as_deref(), required_scopes) {
        return Err(Error::InsufficientScope(required_scopes.to_string()));
    }

    Ok(Principal {
        client_id: response.client_id,
        scope: response.scope,
    })
}

/// Dispatches to the right validation path for `mode`.
pub enum Gate {
    Local(ProxyStore),
    External(CachedIntrospection),
}

impl Gate {
    /// Authenticates a request for `path`, returning `Ok(None)` when `path`
    /// is exempt from gating (OAuth endpoints, well-known discovery,
    /// health and management surfaces) and no bearer token is required.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        expected_resource: &str,
        path: &str,
        required_scopes: &str,
    ) -> Result<Option<Principal>> {
        if !path_requires_gating(path) {
            return Ok(None);
        }
        let principal = match self {
            Gate::Local(store) => gate_local(store, headers, expected_resource, required_scopes)?,
            Gate::External(client) => {
                gate_external(client, headers, expected_resource, required_scopes).await?
            }
        };
        Ok(Some(principal))
    }
}

/// True when `mode` expects the gate to defer to an external AS.
pub fn requires_external_introspection(mode: &OperatingMode) -> bool {
    matches!(mode, OperatingMode::ResourceServerOnly { .. })
}
