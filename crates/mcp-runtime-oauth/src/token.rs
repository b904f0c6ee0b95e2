//! `/token` — exchanges an authorization code (with PKCE) or a refresh
//! token for the proxy's own opaque, resource-bound access token.

use std::time::Duration;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pkce;
use crate::resource::validate_resource_uri;
use crate::store::{IssuedToken, ProxyStore};
use crate::types::{TokenRequest, TokenResponse};

pub struct TokenIssuancePolicy {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

pub fn handle_token_request(
    store: &ProxyStore,
    policy: &TokenIssuancePolicy,
    req: TokenRequest,
) -> Result<TokenResponse> {
    match req.grant_type.as_str() {
        "authorization_code" => authorization_code_grant(store, policy, req),
        "refresh_token" => refresh_token_grant(store, policy, req),
        other => Err(Error::InvalidClientMetadata(format!(
            "unsupported grant_type: {other}"
        ))),
    }
}

fn authenticate_client(store: &ProxyStore, client_id: &str, client_secret: Option<&str>) -> Result<()> {
    let client = store
        .client(client_id)
        .ok_or_else(|| Error::UnknownClient(client_id.to_string()))?;

    match (&client.client_secret_digest, client_secret) {
        (None, _) => Ok(()), // public client: no secret to check
        (Some(_), Some(presented)) if client.secret_matches(presented) => Ok(()),
        _ => Err(Error::InvalidClientCredentials),
    }
}

fn authorization_code_grant(
    store: &ProxyStore,
    policy: &TokenIssuancePolicy,
    req: TokenRequest,
) -> Result<TokenResponse> {
    let code = req
        .code
        .ok_or_else(|| Error::InvalidClientMetadata("missing code".to_string()))?;
    let verifier = req
        .code_verifier
        .ok_or_else(|| Error::InvalidClientMetadata("missing code_verifier".to_string()))?;
    let client_id = req
        .client_id
        .ok_or_else(|| Error::InvalidClientMetadata("missing client_id".to_string()))?;

    let entry = store
        .take_authorization_code(&code)
        .ok_or(Error::InvalidAuthorizationCode)?;

    if entry.client_id != client_id {
        return Err(Error::InvalidAuthorizationCode);
    }

    if let Some(redirect_uri) = &req.redirect_uri {
        if redirect_uri != &entry.redirect_uri {
            return Err(Error::InvalidRedirectUri);
        }
    }

    authenticate_client(store, &client_id, req.client_secret.as_deref())?;

    pkce::verify(&verifier, &entry.code_challenge, entry.code_challenge_method)?;

    if let Some(resource) = &req.resource {
        let canonical = validate_resource_uri(resource)?;
        if canonical != entry.resource {
            return Err(Error::InvalidResource(
                "resource does not match the one the code was issued for".to_string(),
            ));
        }
    }

    issue_tokens(store, policy, &client_id, &entry.resource, entry.scope, entry.upstream_access_token)
}

fn refresh_token_grant(
    store: &ProxyStore,
    policy: &TokenIssuancePolicy,
    req: TokenRequest,
) -> Result<TokenResponse> {
    let refresh_token = req
        .refresh_token
        .ok_or_else(|| Error::InvalidClientMetadata("missing refresh_token".to_string()))?;
    let client_id = req
        .client_id
        .ok_or_else(|| Error::InvalidClientMetadata("missing client_id".to_string()))?;

    let entry = store
        .take_refresh_token(&refresh_token)
        .ok_or(Error::InvalidToken)?;

    if entry.client_id != client_id {
        return Err(Error::InvalidToken);
    }

    authenticate_client(store, &client_id, req.client_secret.as_deref())?;

    issue_tokens(
        store,
        policy,
        &client_id,
        &entry.resource,
        entry.scope,
        entry.upstream_access_token,
    )
}

fn issue_tokens(
    store: &ProxyStore,
    policy: &TokenIssuancePolicy,
    client_id: &str,
    resource: &str,
    scope: Option<String>,
    upstream_access_token: Option<String>,
) -> Result<TokenResponse> {
    let access_token = Uuid::new_v4().to_string();
    let refresh_token = Uuid::new_v4().to_string();

    store.put_access_token(
        &access_token,
        IssuedToken {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            scope: scope.clone(),
            upstream_access_token,
        },
        policy.access_token_ttl,
    );

    store.put_refresh_token(
        &refresh_token,
        IssuedToken {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            scope: scope.clone(),
            upstream_access_token: None,
        },
        policy.refresh_token_ttl,
    );

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: policy.access_token_ttl.as_secs(),
        refresh_token: Some(refresh_token),
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkce::ChallengeMethod;
    use crate::store::{AuthorizationCode, RegisteredClient};

    fn policy() -> TokenIssuancePolicy {
        TokenIssuancePolicy {
            access_token_ttl: Duration::from_secs(3600),
            refresh_token_ttl: Duration::from_secs(86_400),
        }
    }

    fn seeded_store_with_code(verifier: &str) -> (ProxyStore, String) {
        let store = ProxyStore::new();
        store.register_client(RegisteredClient {
            client_id: "client-1".to_string(),
            client_secret_digest: None,
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            grant_types: vec!["authorization_code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
        });
        let challenge = {
            use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
            use sha2::{Digest, Sha256};
            URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
        };
        let code = "auth-code-1".to_string();
        store.put_authorization_code(
            code.clone(),
            AuthorizationCode {
                client_id: "client-1".to_string(),
                redirect_uri: "https://app.example.com/callback".to_string(),
                resource: "https://mcp.example.com/mcp".to_string(),
                code_challenge: challenge,
                code_challenge_method: ChallengeMethod::S256,
                scope: None,
                upstream_access_token: None,
                upstream_refresh_token: None,
            },
            Duration::from_secs(60),
        );
        (store, code)
    }

    #[test]
    fn s6_authorization_code_grant_issues_a_bearer_token() {
        let verifier = "a".repeat(64);
        let (store, code) = seeded_store_with_code(&verifier);
        let req = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: Some(verifier),
            refresh_token: None,
            client_id: Some("client-1".to_string()),
            client_secret: None,
            resource: Some("https://mcp.example.com/mcp".to_string()),
        };
        let resp = handle_token_request(&store, &policy(), req).unwrap();
        assert_eq!(resp.token_type, "Bearer");
        assert!(resp.refresh_token.is_some());
    }

    #[test]
    fn reused_authorization_code_is_rejected() {
        let verifier = "a".repeat(64);
        let (store, code) = seeded_store_with_code(&verifier);
        let req = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code.clone()),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: Some(verifier.clone()),
            refresh_token: None,
            client_id: Some("client-1".to_string()),
            client_secret: None,
            resource: None,
        };
        assert!(handle_token_request(&store, &policy(), req).is_ok());

        let req2 = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: Some(verifier),
            refresh_token: None,
            client_id: Some("client-1".to_string()),
            client_secret: None,
            resource: None,
        };
        assert!(handle_token_request(&store, &policy(), req2).is_err());
    }

    #[test]
    fn wrong_code_verifier_is_rejected() {
        let (store, code) = seeded_store_with_code(&"a".repeat(64));
        let req = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: Some("b".repeat(64)),
            refresh_token: None,
            client_id: Some("client-1".to_string()),
            client_secret: None,
            resource: None,
        };
        let err = handle_token_request(&store, &policy(), req).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_grant");
    }

    #[test]
    fn mismatched_resource_is_rejected() {
        let verifier = "a".repeat(64);
        let (store, code) = seeded_store_with_code(&verifier);
        let req = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: Some(verifier),
            refresh_token: None,
            client_id: Some("client-1".to_string()),
            client_secret: None,
            resource: Some("https://other.example.com/mcp".to_string()),
        };
        let err = handle_token_request(&store, &policy(), req).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_target");
    }

    #[test]
    fn unsupported_grant_type_is_rejected() {
        let store = ProxyStore::new();
        let req = TokenRequest {
            grant_type: "client_credentials".to_string(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            refresh_token: None,
            client_id: None,
            client_secret: None,
            resource: None,
        };
        assert!(handle_token_request(&store, &policy(), req).is_err());
    }
}
