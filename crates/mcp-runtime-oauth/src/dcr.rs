//! RFC 7591 Dynamic Client Registration — server/issuer side.
//!
//! `turbomcp-auth/src/oauth2/dcr.rs` plays the DCR *client* role: it POSTs
//! a `RegistrationRequest` to someone else's authorization server and
//! parses back a `RegistrationResponse`. This module is the mirror image:
//! it receives that same request shape and is the one minting
//! `client_id`/`client_secret` and recording the registration, so the
//! control flow runs in the opposite direction even though the wire
//! shapes in `types.rs` are shared.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::{hash_secret, ProxyStore, RegisteredClient};
use crate::types::{RegistrationRequest, RegistrationResponse};

const SUPPORTED_GRANT_TYPES: &[&str] = &["authorization_code", "refresh_token"];
const SUPPORTED_AUTH_METHODS: &[&str] = &["client_secret_basic", "client_secret_post", "none"];

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn validate_request(req: &RegistrationRequest) -> Result<()> {
    if req.redirect_uris.is_empty() {
        return Err(Error::InvalidClientMetadata(
            "redirect_uris must not be empty".to_string(),
        ));
    }
    for uri in &req.redirect_uris {
        let parsed = url::Url::parse(uri)
            .map_err(|e| Error::InvalidClientMetadata(format!("invalid redirect_uri: {e}")))?;
        if parsed.scheme() != "https" && parsed.host_str() != Some("localhost") {
            return Err(Error::InvalidClientMetadata(
                "redirect_uri must use https, unless it targets localhost".to_string(),
            ));
        }
    }
    for grant in &req.grant_types {
        if !SUPPORTED_GRANT_TYPES.contains(&grant.as_str()) {
            return Err(Error::InvalidClientMetadata(format!(
                "unsupported grant_type: {grant}"
            )));
        }
    }
    if !SUPPORTED_AUTH_METHODS.contains(&req.token_endpoint_auth_method.as_str()) {
        return Err(Error::InvalidClientMetadata(format!(
            "unsupported token_endpoint_auth_method: {}",
            req.token_endpoint_auth_method
        )));
    }
    Ok(())
}

/// Register a new client, issuing a `client_id` and, for confidential
/// clients, a `client_secret`.
pub fn register_client(store: &ProxyStore, req: RegistrationRequest) -> Result<RegistrationResponse> {
    validate_request(&req)?;

    let client_id = Uuid::new_v4().to_string();
    let is_public = req.token_endpoint_auth_method == "none";

    let client_secret = if is_public {
        None
    } else {
        Some(Uuid::new_v4().to_string())
    };

    store.register_client(RegisteredClient {
        client_id: client_id.clone(),
        client_secret_digest: client_secret.as_deref().map(hash_secret),
        redirect_uris: req.redirect_uris.clone(),
        grant_types: req.grant_types.clone(),
        token_endpoint_auth_method: req.token_endpoint_auth_method.clone(),
    });

    Ok(RegistrationResponse {
        client_id,
        client_secret,
        client_id_issued_at: unix_now_secs(),
        client_secret_expires_at: Some(0), // 0 = does not expire, per RFC 7591 §3.2.1
        redirect_uris: req.redirect_uris,
        grant_types: req.grant_types,
        response_types: req.response_types,
        token_endpoint_auth_method: req.token_endpoint_auth_method,
    })
}
