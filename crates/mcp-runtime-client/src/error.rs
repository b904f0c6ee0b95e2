//! Errors raised by the client connector.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode outbound message: {0}")]
    Encode(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request cancelled before a response arrived")]
    Cancelled,

    #[error("initialize handshake rejected: {0}")]
    InitializeFailed(String),
}

impl Error {
    /// Whether [`crate::retry::retry_with_backoff_classify`] should give up
    /// immediately on this error instead of retrying. A rejected
    /// `initialize` handshake reflects a protocol/auth mismatch that a
    /// retry cannot fix on its own.
    pub fn is_non_retryable(&self) -> bool {
        matches!(self, Self::InitializeFailed(_))
    }
}
