//! Session identifiers (spec §3, §4.3).

use std::fmt;

/// Maximum allowed session id length. Bounds memory use of pathological
/// client-supplied or externally generated ids.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new id: `sess-` followed by 128 bits of randomness as hex.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("sess-{hex}"))
    }

    /// Validate and wrap an externally-supplied id (e.g. from a pluggable
    /// generator, or a client-echoed `Mcp-Session-Id`).
    ///
    /// Returns `None` if the id exceeds [`MAX_SESSION_ID_LEN`] or is empty;
    /// per spec §4.3 an invalid generator output falls back to the default
    /// generator with a logged warning, which callers implement by calling
    /// [`SessionId::generate`] when this returns `None`.
    pub fn try_new(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if s.is_empty() || s.len() > MAX_SESSION_ID_LEN {
            None
        } else {
            Some(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_within_bounds() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().len() <= MAX_SESSION_ID_LEN);
    }

    #[test]
    fn try_new_rejects_oversized_id() {
        let too_long = "x".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::try_new(too_long).is_none());
    }

    #[test]
    fn try_new_rejects_empty_id() {
        assert!(SessionId::try_new("").is_none());
    }

    #[test]
    fn try_new_accepts_valid_id() {
        assert!(SessionId::try_new("client-supplied-id").is_some());
    }
}
