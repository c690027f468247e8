//! Renders a `ToolRequest` (already redacted) into the prompt text sent to
//! an inference provider for a `sample` rule.
//!
//! Templates are fixed `&'static str` format strings, never user-supplied;
//! every interpolated field is first passed through `serde_json::to_string`
//! so a value containing quotes or newlines cannot break out of its slot —
//! serialize through a typed/escaped wrapper rather than trust incidental
//! formatting.

use crate::redact::Redactor;
use superego_core::rule::SecurityRule;
use superego_core::ToolRequest;

const EVALUATION_TEMPLATE: &str = "\
You are assessing whether a proposed tool call should be allowed.

Tool: {tool_name}
Agent: {agent_id}
Working directory: {cwd}
Parameters (redacted): {parameters}

Matched rule: {rule_description}
Guidance: {guidance}

Respond with exactly one of: allow, deny, ask. Briefly justify your choice.";

/// Builds evaluation prompts for inference providers.
#[derive(Clone, Default)]
pub struct PromptBuilder {
    redactor: Redactor,
}

impl PromptBuilder {
    /// Build a prompt builder using the given redactor for parameter
    /// rendering.
    #[must_use]
    pub fn new(redactor: Redactor) -> Self {
        Self { redactor }
    }

    /// Render the evaluation prompt for `request` under the `sample` rule
    /// that selected it.
    #[must_use]
    pub fn build_evaluation_prompt(&self, request: &ToolRequest, rule: &SecurityRule) -> String {
        let redacted_params: std::collections::BTreeMap<_, _> = request
            .parameters()
            .iter()
            .map(|(k, v)| (k.clone(), self.redactor.redact_param_tree(v)))
            .collect();

        let tool_name = json_escaped(request.tool_name());
        let agent_id = json_escaped(request.agent_id());
        let cwd = json_escaped(request.cwd());
        let parameters =
            serde_json::to_string(&redacted_params).unwrap_or_else(|_| "{}".to_string());
        let rule_description = json_escaped(&rule.reason_or_default());
        let guidance = rule
            .sampling_guidance
            .as_deref()
            .map(json_escaped)
            .unwrap_or_else(|| "(none)".to_string());

        EVALUATION_TEMPLATE
            .replace("{tool_name}", &tool_name)
            .replace("{agent_id}", &agent_id)
            .replace("{cwd}", &cwd)
            .replace("{parameters}", &parameters)
            .replace("{rule_description}", &rule_description)
            .replace("{guidance}", &guidance)
    }
}

/// Escape `s` the way it would appear inside a JSON string literal, without
/// the surrounding quotes, so it is safe to interpolate into plain text.
///
/// Strips exactly the one pair of delimiter quotes `serde_json::to_string`
/// always wraps its output in — never `trim_matches`, which would also eat
/// a legitimately-escaped quote sitting at the boundary (e.g. a value
/// ending in `"`).
fn json_escaped(s: &str) -> String {
    let quoted = serde_json::to_string(s).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&quoted)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use superego_core::rule::{Conditions, RuleAction};

    fn rule() -> SecurityRule {
        SecurityRule {
            id: "r1".to_string(),
            reason: Some("writes outside workspace".to_string()),
            priority: 10,
            conditions: Conditions::default(),
            action: RuleAction::Sample,
            provider: None,
            sampling_guidance: Some("double-check paths outside the workspace".to_string()),
            tags: vec![],
        }
    }

    #[test]
    fn prompt_contains_tool_name_and_redacted_params() {
        let builder = PromptBuilder::default();
        let req = ToolRequest::new(
            "write_file",
            json!({"path": "/etc/passwd", "password": "hunter2"}),
            "/tmp",
            "s",
            "a",
        )
        .unwrap();
        let prompt = builder.build_evaluation_prompt(&req, &rule());
        assert!(prompt.contains("write_file"));
        assert!(prompt.contains(crate::redact::REDACTED_PLACEHOLDER));
        assert!(!prompt.contains("hunter2"));
    }

    #[test]
    fn prompt_includes_sampling_guidance_and_agent_id() {
        let builder = PromptBuilder::default();
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "agent-7").unwrap();
        let prompt = builder.build_evaluation_prompt(&req, &rule());
        assert!(prompt.contains("agent-7"));
        assert!(prompt.contains("double-check paths outside the workspace"));
    }

    #[test]
    fn missing_guidance_renders_placeholder() {
        let builder = PromptBuilder::default();
        let mut r = rule();
        r.sampling_guidance = None;
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        let prompt = builder.build_evaluation_prompt(&req, &r);
        assert!(prompt.contains("Guidance: (none)"));
    }

    #[test]
    fn embedded_quotes_do_not_break_prompt_structure() {
        let builder = PromptBuilder::default();
        let req = ToolRequest::new("echo", json!({}), "/tmp/\"odd\"", "s", "a").unwrap();
        let prompt = builder.build_evaluation_prompt(&req, &rule());
        assert!(prompt.contains("Working directory:"));
    }

    #[test]
    fn trailing_quote_in_value_is_escaped_not_stripped() {
        assert_eq!(json_escaped("foo\""), "foo\\\"");
        assert_eq!(json_escaped("\"foo"), "\\\"foo");
    }
}
