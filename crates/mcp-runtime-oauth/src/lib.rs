//! OAuth 2.1 proxy and resource-server gate for MCP.
//!
//! Covers Dynamic Client Registration (RFC 7591), PKCE (RFC 7636),
//! Resource Indicators (RFC 8707), Protected Resource Metadata
//! (RFC 9728) and token introspection (RFC 7662), in either of two
//! roles: a self-contained authorization-server proxy fronting an
//! upstream IdP, or a resource-server gate deferring to an external
//! authorization server.

pub mod authorize;
pub mod callback;
pub mod config;
pub mod dcr;
pub mod error;
pub mod gate;
pub mod introspect;
pub mod metadata;
pub mod pkce;
pub mod resource;
pub mod state;
pub mod store;
pub mod token;
pub mod types;
pub mod upstream;

pub use config::{OAuthConfig, OperatingMode};
pub use error::{Error, Result};
pub use gate::{Gate, Principal};
pub use store::ProxyStore;
