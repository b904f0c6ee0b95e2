//! OAuth proxy error taxonomy (spec §7).

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid client metadata: {0}")]
    InvalidClientMetadata(String),

    #[error("unknown client: {0}")]
    UnknownClient(String),

    #[error("invalid client credentials")]
    InvalidClientCredentials,

    #[error("invalid or expired authorization code")]
    InvalidAuthorizationCode,

    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid resource indicator: {0}")]
    InvalidResource(String),

    #[error("invalid redirect_uri")]
    InvalidRedirectUri,

    #[error("upstream authorization server error: {0}")]
    UpstreamError(String),

    #[error("missing bearer token")]
    MissingBearerToken,

    #[error("insufficient scope: requires {0}")]
    InsufficientScope(String),
}

impl Error {
    /// The OAuth 2.0 error code (RFC 6749 §5.2 / §4.1.2.1) this maps to,
    /// for building a spec-shaped JSON error body.
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidClientMetadata(_) => "invalid_client_metadata",
            Self::UnknownClient(_) | Self::InvalidClientCredentials => "invalid_client",
            Self::InvalidAuthorizationCode => "invalid_grant",
            Self::PkceVerificationFailed => "invalid_grant",
            Self::InvalidToken => "invalid_token",
            Self::InvalidResource(_) => "invalid_target",
            Self::InvalidRedirectUri => "invalid_request",
            Self::UpstreamError(_) => "server_error",
            Self::MissingBearerToken => "invalid_token",
            Self::InsufficientScope(_) => "insufficient_scope",
        }
    }
}
