//! Client for the upstream authorization server this proxy fronts.
//!
//! Trimmed down from `turbomcp-auth/src/oauth2/client.rs::OAuth2Client`
//! to just the authorization-code + PKCE exchange it performs on the
//! proxy's behalf — client-credentials and device-code flows aren't
//! needed here, since the proxy only ever acts on behalf of an
//! interactive end user completing a browser redirect.

use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, PkceCodeVerifier,
    RedirectUrl, RefreshToken, TokenResponse, TokenUrl,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct UpstreamTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// Configuration for the upstream authorization server.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

pub struct UpstreamClient {
    http_client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        Ok(Self {
            http_client: reqwest::Client::new(),
            config,
        })
    }

    fn basic_client(&self) -> Result<BasicClient> {
        let auth_url = AuthUrl::new(self.config.auth_url.clone())
            .map_err(|e| Error::UpstreamError(format!("invalid upstream auth_url: {e}")))?;
        let token_url = TokenUrl::new(self.config.token_url.clone())
            .map_err(|e| Error::UpstreamError(format!("invalid upstream token_url: {e}")))?;
        let redirect_url = RedirectUrl::new(self.config.redirect_uri.clone())
            .map_err(|e| Error::UpstreamError(format!("invalid redirect_uri: {e}")))?;

        let mut client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        if let Some(secret) = &self.config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Ok(client)
    }

    /// Build the full authorization URL the end user's browser should be
    /// redirected to, binding our own PKCE challenge for this hop.
    pub fn authorization_url(
        &self,
        scopes: &[String],
        state: String,
        code_challenge: oauth2::PkceCodeChallenge,
    ) -> Result<String> {
        let client = self.basic_client()?;
        let mut request = client
            .authorize_url(|| oauth2::CsrfToken::new(state))
            .set_pkce_challenge(code_challenge);
        for scope in scopes {
            request = request.add_scope(oauth2::Scope::new(scope.clone()));
        }
        let (url, _csrf) = request.url();
        Ok(url.to_string())
    }

    pub async fn exchange_code(&self, code: String, code_verifier: String) -> Result<UpstreamTokens> {
        let client = self.basic_client()?;
        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(code_verifier))
            .request_async(&self.http_client)
            .await
            .map_err(|e| Error::UpstreamError(format!("token exchange failed: {e}")))?;

        Ok(UpstreamTokens {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in().map(|d| d.as_secs()),
            scope: response
                .scopes()
                .map(|s| s.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(" ")),
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<UpstreamTokens> {
        let client = self.basic_client()?;
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| Error::UpstreamError(format!("token refresh failed: {e}")))?;

        Ok(UpstreamTokens {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in().map(|d| d.as_secs()),
            scope: response
                .scopes()
                .map(|s| s.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(" ")),
        })
    }
}
