//! In-memory tables backing the proxy's own authorization-server role:
//! registered clients, issued authorization codes, and issued tokens.
//!
//! Secrets are never stored in plaintext — only their SHA-256 digest, so a
//! compromised store dump cannot be replayed directly. Comparisons against
//! a presented secret still go through [`crate::pkce`]-style constant-time
//! equality at the call site (see `token.rs`).

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

use crate::pkce::ChallengeMethod;

fn digest_hex(value: &str) -> String {
    let hash = Sha256::digest(value.as_bytes());
    hex_encode(&hash)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client_id: String,
    /// SHA-256 digest of the client secret, or `None` for public clients.
    pub client_secret_digest: Option<String>,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

impl RegisteredClient {
    /// Constant-time comparison against the stored digest, so the token
    /// endpoint's client-authentication check does not leak timing
    /// information about how much of the secret the caller guessed right.
    pub fn secret_matches(&self, presented: &str) -> bool {
        match &self.client_secret_digest {
            Some(digest) => digest_hex(presented).as_bytes().ct_eq(digest.as_bytes()).into(),
            None => false,
        }
    }

    pub fn allows_redirect(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub client_id: String,
    pub redirect_uri: String,
    pub resource: String,
    pub code_challenge: String,
    pub code_challenge_method: ChallengeMethod,
    pub scope: Option<String>,
    /// Tokens obtained from the upstream authorization server during the
    /// callback step, carried here until `/token` mints the proxy's own
    /// opaque tokens and relays them onward.
    pub upstream_access_token: Option<String>,
    pub upstream_refresh_token: Option<String>,
    expires_at: Instant,
}

impl AuthorizationCode {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub client_id: String,
    pub resource: String,
    pub scope: Option<String>,
    /// The upstream token this proxy token stands in for, kept so the
    /// resource-server gate can relay it to a downstream API if needed.
    pub upstream_access_token: Option<String>,
    expires_at: Instant,
}

impl IssuedToken {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory registry for the proxy's own clients, authorization codes
/// and issued tokens. One instance is shared across the DCR, authorize,
/// token and introspection handlers.
#[derive(Default)]
pub struct ProxyStore {
    clients: DashMap<String, RegisteredClient>,
    /// Keyed by the plaintext code; codes are single-use, high-entropy
    /// and short-lived so this is not a secret-storage concern the way
    /// client secrets and tokens are.
    authorization_codes: DashMap<String, AuthorizationCode>,
    /// Keyed by the SHA-256 digest of the opaque token string.
    access_tokens: DashMap<String, IssuedToken>,
    refresh_tokens: DashMap<String, IssuedToken>,
    /// Our own PKCE verifier for the upstream hop, keyed by the `flow_id`
    /// carried in the signed proxy state, until the callback consumes it.
    pending_upstream_verifiers: DashMap<String, PendingUpstreamFlow>,
}

struct PendingUpstreamFlow {
    code_verifier: String,
    expires_at: Instant,
}

impl ProxyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&self, client: RegisteredClient) {
        self.clients.insert(client.client_id.clone(), client);
    }

    pub fn client(&self, client_id: &str) -> Option<RegisteredClient> {
        self.clients.get(client_id).map(|r| r.clone())
    }

    pub fn put_authorization_code(&self, code: String, entry: AuthorizationCode, ttl: Duration) {
        let mut entry = entry;
        entry.expires_at = Instant::now() + ttl;
        self.authorization_codes.insert(code, entry);
    }

    /// Consume (single-use) an authorization code, returning it if present
    /// and unexpired.
    pub fn take_authorization_code(&self, code: &str) -> Option<AuthorizationCode> {
        let (_, entry) = self.authorization_codes.remove(code)?;
        if entry.is_expired() {
            None
        } else {
            Some(entry)
        }
    }

    pub fn put_access_token(&self, token: &str, entry: IssuedToken, ttl: Duration) {
        let mut entry = entry;
        entry.expires_at = Instant::now() + ttl;
        self.access_tokens.insert(digest_hex(token), entry);
    }

    pub fn access_token(&self, token: &str) -> Option<IssuedToken> {
        let entry = self.access_tokens.get(&digest_hex(token))?;
        if entry.is_expired() {
            None
        } else {
            Some(entry.clone())
        }
    }

    pub fn revoke_access_token(&self, token: &str) {
        self.access_tokens.remove(&digest_hex(token));
    }

    pub fn put_refresh_token(&self, token: &str, entry: IssuedToken, ttl: Duration) {
        let mut entry = entry;
        entry.expires_at = Instant::now() + ttl;
        self.refresh_tokens.insert(digest_hex(token), entry);
    }

    pub fn take_refresh_token(&self, token: &str) -> Option<IssuedToken> {
        let (_, entry) = self.refresh_tokens.remove(&digest_hex(token))?;
        if entry.is_expired() {
            None
        } else {
            Some(entry)
        }
    }

    pub fn revoke_refresh_token(&self, token: &str) {
        self.refresh_tokens.remove(&digest_hex(token));
    }

    pub fn put_pending_upstream_verifier(&self, flow_id: String, code_verifier: String, ttl: Duration) {
        self.pending_upstream_verifiers.insert(
            flow_id,
            PendingUpstreamFlow {
                code_verifier,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn take_pending_upstream_verifier(&self, flow_id: &str) -> Option<String> {
        let (_, entry) = self.pending_upstream_verifiers.remove(flow_id)?;
        if Instant::now() >= entry.expires_at {
            None
        } else {
            Some(entry.code_verifier)
        }
    }
}

/// Hash a plaintext client secret for storage. Exposed so DCR issuance
/// and credential checks share one digest routine.
pub fn hash_secret(secret: &str) -> String {
    digest_hex(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code() -> AuthorizationCode {
        AuthorizationCode {
            client_id: "client-1".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            resource: "https://mcp.example.com/mcp".to_string(),
            code_challenge: "challenge".to_string(),
            code_challenge_method: ChallengeMethod::S256,
            scope: None,
            upstream_access_token: None,
            upstream_refresh_token: None,
            expires_at: Instant::now(),
        }
    }

    #[test]
    fn client_secret_matches_only_correct_secret() {
        let client = RegisteredClient {
            client_id: "client-1".to_string(),
            client_secret_digest: Some(hash_secret("s3cr3t")),
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            grant_types: vec!["authorization_code".to_string()],
            token_endpoint_auth_method: "client_secret_basic".to_string(),
        };
        assert!(client.secret_matches("s3cr3t"));
        assert!(!client.secret_matches("wrong"));
    }

    #[test]
    fn authorization_code_is_single_use() {
        let store = ProxyStore::new();
        store.put_authorization_code(
            "code-1".to_string(),
            sample_code(),
            Duration::from_secs(60),
        );
        assert!(store.take_authorization_code("code-1").is_some());
        assert!(store.take_authorization_code("code-1").is_none());
    }

    #[test]
    fn expired_authorization_code_is_not_returned() {
        let store = ProxyStore::new();
        store.put_authorization_code(
            "code-1".to_string(),
            sample_code(),
            Duration::from_millis(0),
        );
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.take_authorization_code("code-1").is_none());
    }

    #[test]
    fn access_token_round_trips_and_can_be_revoked() {
        let store = ProxyStore::new();
        let entry = IssuedToken {
            client_id: "client-1".to_string(),
            resource: "https://mcp.example.com/mcp".to_string(),
            scope: None,
            upstream_access_token: None,
            expires_at: Instant::now(),
        };
        store.put_access_token("token-1", entry, Duration::from_secs(60));
        assert!(store.access_token("token-1").is_some());
        store.revoke_access_token("token-1");
        assert!(store.access_token("token-1").is_none());
    }

    #[test]
    fn pending_upstream_verifier_is_single_use() {
        let store = ProxyStore::new();
        store.put_pending_upstream_verifier(
            "flow-1".to_string(),
            "verifier".to_string(),
            Duration::from_secs(60),
        );
        assert_eq!(
            store.take_pending_upstream_verifier("flow-1"),
            Some("verifier".to_string())
        );
        assert!(store.take_pending_upstream_verifier("flow-1").is_none());
    }
}
