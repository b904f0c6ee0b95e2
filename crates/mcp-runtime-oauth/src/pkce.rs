//! PKCE (RFC 7636) verification for the token endpoint.
//!
//! The client side of this dance is handled by the `oauth2` crate's
//! `PkceCodeChallenge::new_random_sha256` in
//! `turbomcp-auth/src/oauth2/client.rs::authorization_code_flow` — that
//! crate plays the client role and only ever generates a challenge. This
//! proxy plays the authorization-server role and must independently
//! recompute the challenge from the verifier presented at `/token` and
//! compare it against the one recorded at `/authorize`, so the check is
//! hand-rolled here rather than reused from `oauth2`.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMethod {
    Plain,
    S256,
}

impl ChallengeMethod {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(Error::InvalidClientMetadata(format!(
                "unsupported code_challenge_method: {other}"
            ))),
        }
    }
}

/// Derive the code_challenge a compliant client would have sent for
/// `verifier` under `method`.
fn derive_challenge(verifier: &str, method: ChallengeMethod) -> String {
    match method {
        ChallengeMethod::Plain => verifier.to_string(),
        ChallengeMethod::S256 => {
            let digest = Sha256::digest(verifier.as_bytes());
            URL_SAFE_NO_PAD.encode(digest)
        }
    }
}

/// Verify a `code_verifier` against the `code_challenge` recorded when the
/// authorization code was issued. Uses a constant-time comparison since
/// the challenge is a secret-derived value.
pub fn verify(verifier: &str, challenge: &str, method: ChallengeMethod) -> Result<()> {
    let expected = derive_challenge(verifier, method);
    if expected.as_bytes().ct_eq(challenge.as_bytes()).into() {
        Ok(())
    } else {
        Err(Error::PkceVerificationFailed)
    }
}
