//! Per-version request/result/notification validators (spec §4.2, §6).
//!
//! Envelopes are strict: an unknown top-level field on a request/response/
//! notification is rejected. `initialize` is the one exception — it is
//! validated with the *earliest-supported-version* validator so a client
//! speaking a newer protocol version than the server can still complete the
//! handshake; unknown-in-version parameter fields are tolerated there.

use crate::error::{Error, Result};
use serde_json::Value;

const REQUEST_FIELDS: &[&str] = &["jsonrpc", "method", "params", "id"];
const NOTIFICATION_FIELDS: &[&str] = &["jsonrpc", "method", "params"];
const RESPONSE_FIELDS: &[&str] = &["jsonrpc", "id", "result", "error"];

fn reject_unknown_fields(v: &Value, allowed: &[&str], what: &str) -> Result<()> {
    let Value::Object(map) = v else {
        return Err(Error::InvalidRequest(format!("{what} must be a JSON object")));
    };
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(Error::InvalidRequest(format!(
                "{what} has unknown field: {key}"
            )));
        }
    }
    Ok(())
}

/// Validate a raw request envelope's top-level shape. Strict: unknown
/// fields are rejected.
pub fn validate_request_envelope(v: &Value) -> Result<()> {
    reject_unknown_fields(v, REQUEST_FIELDS, "request envelope")?;
    if v.get("method").and_then(Value::as_str).is_none() {
        return Err(Error::InvalidRequest("missing method".into()));
    }
    if v.get("id").is_none() {
        return Err(Error::InvalidRequest("missing id".into()));
    }
    Ok(())
}

/// Validate a raw notification envelope's top-level shape (no `id`).
pub fn validate_notification_envelope(v: &Value) -> Result<()> {
    reject_unknown_fields(v, NOTIFICATION_FIELDS, "notification envelope")?;
    if v.get("method").and_then(Value::as_str).is_none() {
        return Err(Error::InvalidRequest("missing method".into()));
    }
    if v.get("id").is_some() {
        return Err(Error::InvalidRequest(
            "notification envelope must not have id".into(),
        ));
    }
    Ok(())
}

/// Validate a raw response envelope's top-level shape.
pub fn validate_response_envelope(v: &Value) -> Result<()> {
    reject_unknown_fields(v, RESPONSE_FIELDS, "response envelope")?;
    let has_result = v.get("result").is_some();
    let has_error = v.get("error").is_some();
    if has_result == has_error {
        return Err(Error::InvalidRequest(
            "response must have exactly one of result/error".into(),
        ));
    }
    Ok(())
}

/// A per-method parameter schema: `required` keys must be present,
/// `optional` keys may be present, any other key is rejected in strict mode.
pub struct ParamSchema {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl ParamSchema {
    const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self { required, optional }
    }

    fn validate(&self, params: &Value, lenient: bool) -> Result<()> {
        let Value::Object(map) = params else {
            return Err(Error::InvalidParams("params must be an object".into()));
        };
        for req in self.required {
            if !map.contains_key(*req) {
                return Err(Error::InvalidParams(format!("missing required param: {req}")));
            }
        }
        if lenient {
            return Ok(());
        }
        for key in map.keys() {
            if !self.required.contains(&key.as_str()) && !self.optional.contains(&key.as_str()) {
                return Err(Error::InvalidParams(format!("unknown param: {key}")));
            }
        }
        Ok(())
    }
}

/// Look up the parameter schema for a known method, if any. Methods with no
/// entry here (e.g. `ping`, which per spec takes `{}`) impose no schema
/// beyond "params is an object or absent".
fn schema_for(method: &str) -> Option<ParamSchema> {
    match method {
        "initialize" => Some(ParamSchema::new(
            &["protocolVersion", "capabilities", "clientInfo"],
            &["_meta"],
        )),
        "resources/read" => Some(ParamSchema::new(&["uri"], &["_meta"])),
        "resources/subscribe" | "resources/unsubscribe" => {
            Some(ParamSchema::new(&["uri"], &["_meta"]))
        }
        "resources/list" | "resources/templates/list" | "prompts/list" | "tools/list" => {
            Some(ParamSchema::new(&[], &["cursor", "_meta"]))
        }
        "prompts/get" => Some(ParamSchema::new(&["name"], &["arguments", "_meta"])),
        "tools/call" => Some(ParamSchema::new(&["name"], &["arguments", "_meta"])),
        "completion/complete" => Some(ParamSchema::new(&["ref", "argument"], &["_meta"])),
        "logging/setLevel" => Some(ParamSchema::new(&["level"], &["_meta"])),
        _ => None,
    }
}

/// Validate a method's params against the negotiated-version validator.
///
/// `initialize` uses the lenient, earliest-supported-version validator per
/// spec §4.2 so unknown-in-version fields don't fail the handshake; every
/// other method is validated strictly.
pub fn validate_params(method: &str, params: Option<&Value>) -> Result<()> {
    let lenient = method == "initialize";
    match schema_for(method) {
        Some(schema) => {
            let empty = Value::Object(Default::default());
            let params = params.unwrap_or(&empty);
            schema.validate(params, lenient)
        }
        None => Ok(()),
    }
}
