//! Translates the `PreToolUse` hook wire shape to/from
//! `superego_core::{ToolRequest, Decision}`.
//!
//! Typed struct + serde derive + `new_*`/`from_*` constructors, matching
//! the `hookEventName`/`permission_decision` field shape used on the wire.

use serde::{Deserialize, Serialize};
use superego_core::{Decision, DecisionAction, Error, ToolRequest};

/// The event name this crate translates. Any other value in an incoming
/// envelope is accepted (so the wire format can grow other hook kinds
/// later) but `superego-hooks` only knows how to build a `ToolRequest`
/// from `PreToolUse`.
pub const PRE_TOOL_USE: &str = "PreToolUse";

/// The raw `PreToolUse` hook input, as sent by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    /// Opaque session identifier.
    pub session_id: String,
    /// Path to the session transcript (not interpreted here, carried
    /// through unused — the host's own bookkeeping).
    #[serde(default)]
    pub transcript_path: String,
    /// Working directory the tool would run in.
    pub cwd: String,
    /// Hook event name; expected to be [`PRE_TOOL_USE`].
    pub hook_event_name: String,
    /// Name of the tool the agent proposes to invoke.
    pub tool_name: String,
    /// Tool-specific argument payload.
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

impl HookInput {
    /// Parse a `PreToolUse` input from its raw JSON text.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if `text` is not valid JSON or is
    /// missing a required field.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Build the sanitized [`ToolRequest`] this input describes.
    ///
    /// Agent identity is not part of the hook wire schema, so `agent_id`
    /// is derived from `session_id` (every hook call in a session shares
    /// one implicit agent).
    ///
    /// # Errors
    /// Returns [`superego_core::ErrorKind::InvalidInput`] if `tool_name`
    /// fails [`ToolRequest::new`]'s identifier check.
    pub fn into_tool_request(self) -> Result<ToolRequest, Error> {
        ToolRequest::new(&self.tool_name, self.tool_input, &self.cwd, &self.session_id, &self.session_id)
    }
}

/// The `hook_specific_output` nested object of [`HookOutput`].
#[derive(Debug, Clone, Serialize)]
pub struct HookSpecificOutput {
    /// Always [`PRE_TOOL_USE`], echoed back for the host's dispatch.
    pub hook_event_name: String,
    /// `"allow" | "deny" | "ask"`.
    pub permission_decision: String,
    /// Human-readable reason shown alongside the decision.
    pub permission_decision_reason: String,
}

/// The full `PreToolUse` hook output, sent back to the host.
#[derive(Debug, Clone, Serialize)]
pub struct HookOutput {
    /// Structured decision detail.
    pub hook_specific_output: HookSpecificOutput,
    /// Legacy mirror: `"approve"` for `allow`, `"block"` for `deny`/`ask`.
    pub decision: String,
    /// Same text as `permission_decision_reason`, duplicated at the top
    /// level for hosts that only read the legacy shape.
    pub reason: String,
}

impl HookOutput {
    /// Build the hook output for a policy [`Decision`].
    #[must_use]
    pub fn from_decision(decision: &Decision) -> Self {
        let (permission_decision, legacy_decision, reason) = match decision.action {
            DecisionAction::Allow => ("allow", "approve", decision.reason.clone()),
            DecisionAction::Deny => ("deny", "block", decision.reason.clone()),
            DecisionAction::Ask => (
                "ask",
                "block",
                format!("escalated for human review: {}", decision.reason),
            ),
        };
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: PRE_TOOL_USE.to_string(),
                permission_decision: permission_decision.to_string(),
                permission_decision_reason: reason.clone(),
            },
            decision: legacy_decision.to_string(),
            reason,
        }
    }

    /// Build the fail-closed output used when the input itself could not
    /// be parsed or evaluated (§4.H: "any failure ... returns a hook
    /// output that blocks with a safe reason").
    #[must_use]
    pub fn blocked(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: PRE_TOOL_USE.to_string(),
                permission_decision: "deny".to_string(),
                permission_decision_reason: reason.clone(),
            },
            decision: "block".to_string(),
            reason,
        }
    }

    /// Serialize to the wire JSON shape.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` on a serialization failure; none of
    /// this type's fields can fail to serialize in practice, so callers
    /// may treat this as infallible.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Parse `input_text` and return either the translated [`ToolRequest`] or
/// the safe, blocking [`HookOutput`] to emit directly if parsing failed.
pub fn parse_hook_input(input_text: &str) -> Result<ToolRequest, HookOutput> {
    let input = HookInput::from_json(input_text)
        .map_err(|e| HookOutput::blocked(format!("invalid hook input: {e}")))?;
    input
        .into_tool_request()
        .map_err(|e| HookOutput::blocked(format!("invalid tool request: {}", e.user_message())))
}
