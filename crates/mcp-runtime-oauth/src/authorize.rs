//! `/authorize` — validates the client's request and redirects the
//! end user's browser to the upstream authorization server.
//!
//! The proxy generates its own PKCE pair for the upstream hop the same
//! way `turbomcp-auth/src/oauth2/client.rs::authorization_code_flow`
//! does (`PkceCodeChallenge::new_random_sha256`), since here the proxy
//! itself is the OAuth *client* talking to that upstream server.

use oauth2::PkceCodeChallenge;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pkce::ChallengeMethod;
use crate::resource::validate_resource_uri;
use crate::state::StateCodec;
use crate::store::ProxyStore;
use crate::types::AuthorizeRequest;
use crate::upstream::UpstreamClient;

pub struct AuthorizeOutcome {
    pub redirect_url: String,
}

#[allow(clippy::too_many_arguments)]
pub fn build_authorize_redirect(
    store: &ProxyStore,
    state_codec: &StateCodec,
    upstream: &UpstreamClient,
    scopes: &[String],
    req: AuthorizeRequest,
    now_secs: u64,
    state_ttl_secs: u64,
) -> Result<AuthorizeOutcome> {
    if req.response_type != "code" {
        return Err(Error::InvalidClientMetadata(format!(
            "unsupported response_type: {}",
            req.response_type
        )));
    }

    let client = store
        .client(&req.client_id)
        .ok_or_else(|| Error::UnknownClient(req.client_id.clone()))?;

    if !client.allows_redirect(&req.redirect_uri) {
        return Err(Error::InvalidRedirectUri);
    }

    let resource = validate_resource_uri(&req.resource)?;
    ChallengeMethod::parse(&req.code_challenge_method)?;

    let flow_id = Uuid::new_v4().to_string();
    let (upstream_challenge, upstream_verifier) = PkceCodeChallenge::new_random_sha256();
    store.put_pending_upstream_verifier(
        flow_id.clone(),
        upstream_verifier.secret().clone(),
        std::time::Duration::from_secs(state_ttl_secs),
    );

    let proxy_state = state_codec.encode(
        &flow_id,
        &req.client_id,
        &req.redirect_uri,
        &resource,
        &req.code_challenge,
        &req.code_challenge_method,
        &req.state,
        now_secs,
        state_ttl_secs,
    )?;

    let redirect_url = upstream.authorization_url(scopes, proxy_state, upstream_challenge)?;

    Ok(AuthorizeOutcome { redirect_url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RegisteredClient;
    use crate::upstream::UpstreamConfig;

    fn seeded_store() -> ProxyStore {
        let store = ProxyStore::new();
        store.register_client(RegisteredClient {
            client_id: "client-1".to_string(),
            client_secret_digest: None,
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            grant_types: vec!["authorization_code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
        });
        store
    }

    fn sample_request() -> AuthorizeRequest {
        AuthorizeRequest {
            response_type: "code".to_string(),
            client_id: "client-1".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scope: None,
            state: "client-opaque-state".to_string(),
            code_challenge: "challenge".to_string(),
            code_challenge_method: "S256".to_string(),
            resource: "https://mcp.example.com/mcp".to_string(),
        }
    }

    fn upstream_client() -> UpstreamClient {
        UpstreamClient::new(UpstreamConfig {
            auth_url: "https://idp.example.com/authorize".to_string(),
            token_url: "https://idp.example.com/token".to_string(),
            client_id: "proxy-upstream-client".to_string(),
            client_secret: Some("upstream-secret".to_string()),
            redirect_uri: "https://mcp.example.com/callback".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn known_client_with_valid_redirect_gets_upstream_redirect() {
        let store = seeded_store();
        let codec = StateCodec::new(b"test-signing-key-0123456789abcdef");
        let upstream = upstream_client();
        let outcome = build_authorize_redirect(
            &store,
            &codec,
            &upstream,
            &["openid".to_string()],
            sample_request(),
            1_000,
            60,
        )
        .unwrap();
        assert!(outcome.redirect_url.starts_with("https://idp.example.com/authorize"));
    }

    #[test]
    fn unknown_client_is_rejected() {
        let store = ProxyStore::new();
        let codec = StateCodec::new(b"test-signing-key-0123456789abcdef");
        let upstream = upstream_client();
        let err = build_authorize_redirect(
            &store,
            &codec,
            &upstream,
            &[],
            sample_request(),
            1_000,
            60,
        )
        .unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");
    }

    #[test]
    fn mismatched_redirect_uri_is_rejected() {
        let store = seeded_store();
        let codec = StateCodec::new(b"test-signing-key-0123456789abcdef");
        let upstream = upstream_client();
        let mut req = sample_request();
        req.redirect_uri = "https://evil.example.com/callback".to_string();
        let err =
            build_authorize_redirect(&store, &codec, &upstream, &[], req, 1_000, 60).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[test]
    fn non_canonical_resource_is_rejected() {
        let store = seeded_store();
        let codec = StateCodec::new(b"test-signing-key-0123456789abcdef");
        let upstream = upstream_client();
        let mut req = sample_request();
        req.resource = "HTTPS://mcp.example.com/mcp".to_string();
        let err =
            build_authorize_redirect(&store, &codec, &upstream, &[], req, 1_000, 60).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_target");
    }
}
