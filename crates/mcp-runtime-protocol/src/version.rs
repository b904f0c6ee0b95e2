//! Protocol version negotiation (spec §4.2, §6).
//!
//! The set of supported protocol versions is a closed, ordered list, newest
//! first. Negotiation returns the client's requested version if it is
//! supported, otherwise the first (newest) element.

/// Closed, newest-first list of supported MCP protocol versions.
pub const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// A negotiated MCP protocol version.
///
/// Always one of [`SUPPORTED_VERSIONS`]; constructed only via
/// [`ProtocolVersion::negotiate`] or [`ProtocolVersion::latest`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    /// Negotiate a version: return the client's requested version verbatim
    /// if it is in [`SUPPORTED_VERSIONS`], otherwise fall back to the first
    /// (highest) supported version.
    pub fn negotiate(requested: Option<&str>) -> Self {
        match requested {
            Some(v) if SUPPORTED_VERSIONS.contains(&v) => Self(v.to_string()),
            _ => Self::latest(),
        }
    }

    /// The newest supported version.
    pub fn latest() -> Self {
        Self(SUPPORTED_VERSIONS[0].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Seed scenario S1.
    #[test]
    fn s1_negotiates_requested_version_when_supported() {
        let v = ProtocolVersion::negotiate(Some("2025-03-26"));
        assert_eq!(v.as_str(), "2025-03-26");
    }

    #[test]
    fn s1_falls_back_to_newest_when_unsupported() {
        let v = ProtocolVersion::negotiate(Some("2024-10-01"));
        assert_eq!(v.as_str(), "2025-06-18");
    }

    #[test]
    fn falls_back_to_newest_when_absent() {
        let v = ProtocolVersion::negotiate(None);
        assert_eq!(v.as_str(), SUPPORTED_VERSIONS[0]);
    }
}
