//! Resolves one of a [`superego_core::rule::Conditions`] node's fixed field
//! names (`tool_name`, `parameters`, `cwd`, `session_id`, `agent_id`)
//! against a request.

use crate::jsonpath;
use serde_json::Value;
use superego_core::ToolRequest;

/// Render the parts of a request that conditions may match against as one
/// JSON object, rooted the same way for every dialect.
fn request_to_json(request: &ToolRequest) -> Value {
    serde_json::json!({
        "tool_name": request.tool_name(),
        "cwd": request.cwd(),
        "session_id": request.session_id(),
        "agent_id": request.agent_id(),
        "parameters": request
            .parameters()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>(),
    })
}

/// Resolve `field` (a dotted/bracketed path, e.g. `tool_name` or
/// `parameters.path`) against `request`, returning the leaf JSON value if
/// present.
#[must_use]
pub fn resolve_field(request: &ToolRequest, field: &str) -> Option<Value> {
    let root = request_to_json(request);
    jsonpath::resolve(&root, field).cloned()
}

/// Render a resolved JSON leaf as a string for string/regex/glob matching.
/// Strings render unquoted; everything else renders through
/// [`crate::canonical::canonical_string`] so object-valued leaves with the
/// same content but differently ordered keys stringify (and therefore hash)
/// identically.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => crate::canonical::canonical_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_top_level_field() {
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        assert_eq!(resolve_field(&req, "tool_name"), Some(json!("write_file")));
    }

    #[test]
    fn resolves_nested_parameter() {
        let req =
            ToolRequest::new("write_file", json!({"path": "/etc/passwd"}), "/tmp", "s", "a")
                .unwrap();
        assert_eq!(resolve_field(&req, "parameters.path"), Some(json!("/etc/passwd")));
    }

    #[test]
    fn missing_field_resolves_to_none() {
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        assert_eq!(resolve_field(&req, "parameters.missing"), None);
    }
}
