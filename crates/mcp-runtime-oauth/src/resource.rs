//! RFC 8707 Resource Indicators: canonical resource URI validation.
//!
//! Access tokens issued by this proxy are bound to a specific resource
//! (the MCP server's canonical URI), preventing a token minted for one
//! resource server from being replayed against another. Grounded on
//! `turbomcp-auth/src/oauth2/{validation.rs,resource.rs}`, merged into a
//! single validate-and-canonicalize pass since this crate only ever needs
//! the canonical string, not the separate pre-parse check the teacher
//! splits across two functions.

use crate::error::{Error, Result};
use url::Url;

/// Validate a `resource` parameter and return it in canonical form.
///
/// Canonical form: lowercase scheme and host, no fragment, no query,
/// default ports omitted, trailing slash stripped except for the root
/// path.
pub fn validate_resource_uri(uri: &str) -> Result<String> {
    let scheme_end = uri
        .find("://")
        .ok_or_else(|| Error::InvalidResource("missing scheme".to_string()))?;
    let raw_scheme = &uri[..scheme_end];
    if raw_scheme != raw_scheme.to_lowercase() {
        return Err(Error::InvalidResource(
            "scheme must be lowercase (canonical form)".to_string(),
        ));
    }

    let parsed =
        Url::parse(uri).map_err(|e| Error::InvalidResource(format!("invalid URI: {e}")))?;

    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(Error::InvalidResource(
            "resource URI must use http or https scheme".to_string(),
        ));
    }

    if parsed.fragment().is_some() {
        return Err(Error::InvalidResource(
            "resource URI must not contain a fragment".to_string(),
        ));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidResource("resource URI must include a host".to_string()))?;

    let host_start = scheme_end + 3;
    let host_in_uri = &uri[host_start..];
    let host_end = host_in_uri
        .find(['/', ':', '?', '#'])
        .unwrap_or(host_in_uri.len());
    if &host_in_uri[..host_end] != host {
        return Err(Error::InvalidResource(
            "host must be lowercase (canonical form)".to_string(),
        ));
    }

    Ok(canonicalize(&parsed, host))
}

fn canonicalize(url: &Url, host: &str) -> String {
    let scheme = url.scheme();
    let port = match url.port() {
        Some(p) if (scheme == "https" && p == 443) || (scheme == "http" && p == 80) => {
            String::new()
        }
        Some(p) => format!(":{p}"),
        None => String::new(),
    };
    let path = url.path();
    let path = if path == "/" {
        path.to_string()
    } else {
        path.trim_end_matches('/').to_string()
    };
    format!("{scheme}://{host}{port}{path}")
}

/// True when `token_resource` matches the resource a request was made
/// against, per RFC 8707's audience-binding requirement.
pub fn resource_matches(token_resource: &str, requested_resource: &str) -> bool {
    token_resource == requested_resource
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_uri_round_trips() {
        assert_eq!(
            validate_resource_uri("https://mcp.example.com/mcp").unwrap(),
            "https://mcp.example.com/mcp"
        );
    }

    #[test]
    fn trailing_slash_is_stripped_except_root() {
        assert_eq!(
            validate_resource_uri("https://mcp.example.com/mcp/").unwrap(),
            "https://mcp.example.com/mcp"
        );
        assert_eq!(
            validate_resource_uri("https://mcp.example.com/").unwrap(),
            "https://mcp.example.com/"
        );
    }

    #[test]
    fn default_port_is_omitted_nondefault_kept() {
        assert_eq!(
            validate_resource_uri("https://mcp.example.com:443/mcp").unwrap(),
            "https://mcp.example.com/mcp"
        );
        assert_eq!(
            validate_resource_uri("https://mcp.example.com:8443/mcp").unwrap(),
            "https://mcp.example.com:8443/mcp"
        );
    }

    #[test]
    fn uppercase_scheme_is_rejected_as_non_canonical() {
        let err = validate_resource_uri("HTTPS://mcp.example.com/mcp").unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_target");
    }

    #[test]
    fn uppercase_host_is_rejected_as_non_canonical() {
        assert!(validate_resource_uri("https://MCP.example.com/mcp").is_err());
    }

    #[test]
    fn fragment_is_rejected() {
        assert!(validate_resource_uri("https://mcp.example.com/mcp#frag").is_err());
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        assert!(validate_resource_uri("ftp://mcp.example.com/mcp").is_err());
    }

    #[test]
    fn query_parameters_are_dropped_from_canonical_form() {
        assert_eq!(
            validate_resource_uri("https://mcp.example.com/mcp?x=1").unwrap(),
            "https://mcp.example.com/mcp"
        );
    }

    #[test]
    fn resource_matches_is_exact() {
        assert!(resource_matches(
            "https://mcp.example.com/mcp",
            "https://mcp.example.com/mcp"
        ));
        assert!(!resource_matches(
            "https://mcp.example.com/mcp",
            "https://other.example.com/mcp"
        ));
    }
}
