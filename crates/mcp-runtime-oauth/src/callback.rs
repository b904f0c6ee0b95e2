//! `/callback` — receives the upstream authorization server's redirect,
//! exchanges its code for upstream tokens, and mints this proxy's own
//! single-use authorization code for the original client.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::state::StateCodec;
use crate::store::{AuthorizationCode, ProxyStore};
use crate::upstream::UpstreamClient;

pub struct CallbackOutcome {
    pub redirect_url: String,
}

pub async fn handle_callback(
    store: &ProxyStore,
    state_codec: &StateCodec,
    upstream: &UpstreamClient,
    code: String,
    state: String,
    now_secs: u64,
    code_ttl_secs: u64,
) -> Result<CallbackOutcome> {
    let proxy_state = state_codec.decode(&state, now_secs)?;

    let verifier = store
        .take_pending_upstream_verifier(&proxy_state.flow_id)
        .ok_or(Error::InvalidRedirectUri)?;

    let tokens = upstream.exchange_code(code, verifier).await?;

    let code_challenge_method = proxy_state.challenge_method()?;
    let redirect_uri = proxy_state.redirect_uri.clone();
    let client_state = proxy_state.client_state.clone();

    let local_code = Uuid::new_v4().to_string();
    store.put_authorization_code(
        local_code.clone(),
        AuthorizationCode {
            client_id: proxy_state.client_id,
            redirect_uri: redirect_uri.clone(),
            resource: proxy_state.resource,
            code_challenge: proxy_state.code_challenge,
            code_challenge_method,
            scope: tokens.scope,
            upstream_access_token: Some(tokens.access_token),
            upstream_refresh_token: tokens.refresh_token,
        },
        std::time::Duration::from_secs(code_ttl_secs),
    );

    let mut redirect = url::Url::parse(&redirect_uri).map_err(|_| Error::InvalidRedirectUri)?;
    redirect
        .query_pairs_mut()
        .append_pair("code", &local_code)
        .append_pair("state", &client_state);

    Ok(CallbackOutcome {
        redirect_url: redirect.to_string(),
    })
}
