//! JWT-encoded proxy state carried through the authorize -> upstream AS
//! -> callback round trip.
//!
//! When running in resource-server-only mode this proxy still fronts an
//! external authorization server's login page; the original client's
//! `redirect_uri`, PKCE challenge and `resource` have to survive that
//! detour without server-side session storage, so they are packed into a
//! short-lived signed JWT and handed back as the `state` parameter on the
//! upstream request, mirroring how `turbomcp-auth` treats tokens as
//! self-contained signed claims (`jwt/validator.rs`) rather than opaque
//! session-store lookups.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pkce::ChallengeMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyState {
    /// Correlates this flow with the proxy's own stashed upstream PKCE
    /// verifier in `ProxyStore::pending_upstream_verifiers`.
    pub flow_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub resource: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub client_state: String,
    exp: u64,
}

impl ProxyState {
    pub fn challenge_method(&self) -> Result<ChallengeMethod> {
        ChallengeMethod::parse(&self.code_challenge_method)
    }
}

pub struct StateCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl StateCodec {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        flow_id: &str,
        client_id: &str,
        redirect_uri: &str,
        resource: &str,
        code_challenge: &str,
        code_challenge_method: &str,
        client_state: &str,
        now_secs: u64,
        ttl_secs: u64,
    ) -> Result<String> {
        let claims = ProxyState {
            flow_id: flow_id.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            resource: resource.to_string(),
            code_challenge: code_challenge.to_string(),
            code_challenge_method: code_challenge_method.to_string(),
            client_state: client_state.to_string(),
            exp: now_secs + ttl_secs,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| Error::UpstreamError(format!("failed to encode proxy state: {e}")))
    }

    /// Decode and verify the signature, then check expiry against the
    /// caller-supplied `now_secs` rather than jsonwebtoken's built-in
    /// wall-clock check, so callers can pass the same time source they
    /// used elsewhere (and tests stay deterministic).
    pub fn decode(&self, token: &str, now_secs: u64) -> Result<ProxyState> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let data = decode::<ProxyState>(token, &self.decoding_key, &validation)
            .map_err(|_| Error::InvalidRedirectUri)?;
        if data.claims.exp < now_secs {
            return Err(Error::InvalidRedirectUri);
        }
        Ok(data.claims)
    }
}
