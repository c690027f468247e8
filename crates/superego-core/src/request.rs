//! The `ToolRequest` type: a normalized, sanitized description of a single
//! tool invocation proposed by an agent, as it flows through the gateway.

use crate::error::Error;
use crate::ids::now;
use crate::param::ParamValue;
use crate::sanitize::{
    bound_len, sanitize_opaque_id, strip_control_chars, strip_path_traversal, DEFAULT_STRING_CAP,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static TOOL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex is valid"));

/// Upper bound on a request's total serialized parameter size (§3: "total
/// serialized size bounded (recommended ≤ 256 KiB)").
pub const MAX_PARAMETERS_SIZE: usize = 256 * 1024;

/// A single proposed tool invocation, sanitized and frozen at construction.
///
/// Every scalar field has already passed through [`crate::sanitize`] by the
/// time a `ToolRequest` exists; downstream crates (pattern matching, policy,
/// inference) can assume the invariants below hold without re-checking them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    tool_name: String,
    parameters: BTreeMap<String, ParamValue>,
    cwd: String,
    session_id: String,
    agent_id: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl ToolRequest {
    /// Construct a new `ToolRequest`, sanitizing every field.
    ///
    /// # Errors
    /// Returns [`crate::error::ErrorKind::InvalidInput`] if `tool_name` is
    /// empty after sanitization or does not match `^[A-Za-z_][A-Za-z0-9_]*$`.
    pub fn new(
        tool_name: &str,
        parameters: serde_json::Value,
        cwd: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Result<Self, Error> {
        let tool_name = bound_len(&strip_control_chars(tool_name), 128);
        if !TOOL_NAME_RE.is_match(&tool_name) {
            return Err(Error::invalid_input(format!(
                "tool_name '{tool_name}' does not match required identifier pattern"
            )));
        }

        let parameters = match ParamValue::from_json(&parameters) {
            ParamValue::Object(map) => map,
            ParamValue::Null => BTreeMap::new(),
            other => {
                let mut map = BTreeMap::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let cwd = bound_len(&strip_path_traversal(&strip_control_chars(cwd)), DEFAULT_STRING_CAP);
        let session_id = sanitize_opaque_id(session_id);
        let agent_id = sanitize_opaque_id(agent_id);

        let size: usize = parameters.values().map(ParamValue::approx_size).sum();
        if size > MAX_PARAMETERS_SIZE {
            return Err(Error::invalid_input(format!(
                "parameters size {size} exceeds {MAX_PARAMETERS_SIZE} byte bound"
            )));
        }

        Ok(Self { tool_name, parameters, cwd, session_id, agent_id, timestamp: now() })
    }

    /// The sanitized tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// The sanitized parameter tree.
    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    /// Look up a single top-level parameter by name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    /// The sanitized working directory the tool would run in.
    #[must_use]
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// The sanitized session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The sanitized agent identifier.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Construction timestamp (UTC).
    #[must_use]
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.timestamp
    }

    /// Total approximate serialized size of the parameter tree, in bytes.
    #[must_use]
    pub fn parameters_size(&self) -> usize {
        self.parameters.values().map(ParamValue::approx_size).sum()
    }

    /// Build a copy of this request with `parameters` replaced.
    ///
    /// Used by `superego-audit` to store a redacted parameter tree
    /// alongside the otherwise-unchanged request, without re-running (or
    /// bypassing) the sanitization `new` performs on the other fields.
    #[must_use]
    pub fn with_parameters(mut self, parameters: BTreeMap<String, ParamValue>) -> Self {
        self.parameters = parameters;
        self
    }
}
