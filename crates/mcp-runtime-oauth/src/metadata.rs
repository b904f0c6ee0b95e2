//! RFC 9728 Protected Resource Metadata and the `WWW-Authenticate`
//! challenge it's advertised through. Grounded on
//! `turbomcp-auth/src/server.rs`'s `ProtectedResourceMetadataBuilder`
//! and `WwwAuthenticateBuilder`.

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerTokenMethod {
    Header,
    Query,
    Body,
}

impl BearerTokenMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtectedResourceMetadataBuilder {
    resource: String,
    authorization_server: String,
    scopes: Vec<String>,
    bearer_methods: Vec<BearerTokenMethod>,
    documentation_uri: Option<String>,
}

impl ProtectedResourceMetadataBuilder {
    pub fn new(resource: String, authorization_server: String) -> Self {
        Self {
            resource,
            authorization_server,
            scopes: vec![],
            bearer_methods: vec![BearerTokenMethod::Header],
            documentation_uri: None,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_bearer_methods(mut self, methods: Vec<BearerTokenMethod>) -> Self {
        self.bearer_methods = methods;
        self
    }

    pub fn with_documentation(mut self, uri: String) -> Self {
        self.documentation_uri = Some(uri);
        self
    }

    pub fn build(self) -> Value {
        let mut metadata = json!({
            "resource": self.resource,
            "authorization_servers": [self.authorization_server],
            "scopes_supported": self.scopes,
            "bearer_methods_supported": self.bearer_methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>(),
        });

        if let Some(doc) = self.documentation_uri {
            metadata["resource_documentation"] = Value::String(doc);
        }

        metadata
    }
}

/// Builds the `WWW-Authenticate` header value a 401 response carries,
/// per RFC 9728 §5.1, pointing the client at this resource's metadata.
#[derive(Debug, Clone)]
pub struct WwwAuthenticateBuilder {
    metadata_uri: String,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl WwwAuthenticateBuilder {
    pub fn new(metadata_uri: String) -> Self {
        Self {
            metadata_uri,
            scope: None,
            error: None,
            error_description: None,
        }
    }

    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_error(mut self, error: String, description: Option<String>) -> Self {
        self.error = Some(error);
        self.error_description = description;
        self
    }

    pub fn build(self) -> String {
        let mut parts = vec![format!("Bearer resource_metadata=\"{}\"", self.metadata_uri)];
        if let Some(scope) = self.scope {
            parts.push(format!("scope=\"{scope}\""));
        }
        if let Some(error) = self.error {
            parts.push(format!("error=\"{error}\""));
        }
        if let Some(description) = self.error_description {
            parts.push(format!("error_description=\"{description}\""));
        }
        parts.join(", ")
    }
}

pub fn unauthorized_response_body(metadata_uri: &str, scope: Option<&str>) -> Value {
    let mut body = json!({
        "error": "unauthorized",
        "error_description": "a valid bearer token is required",
        "metadata_uri": metadata_uri,
    });
    if let Some(scope) = scope {
        body["required_scope"] = Value::String(scope.to_string());
    }
    body
}
