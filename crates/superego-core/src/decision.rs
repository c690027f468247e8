//! The `Decision` type: the outcome of evaluating a `ToolRequest` against the
//! active `RuleSet`.

use serde::{Deserialize, Serialize};

/// The allow/deny/ask verdict produced by the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    /// The tool call may proceed.
    Allow,
    /// The tool call must not proceed.
    Deny,
    /// No rule reached a confident verdict; a human should decide.
    Ask,
}

/// The full result of evaluating a single `ToolRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// The verdict.
    pub action: DecisionAction,
    /// Human-readable explanation, safe to surface to the agent or operator.
    pub reason: String,
    /// The rule that produced this decision, if any (absent for the
    /// built-in fail-closed default).
    #[serde(default)]
    pub rule_id: Option<String>,
    /// Confidence in `[0.0, 1.0]`; `1.0` for deterministic rule matches,
    /// lower for inference-sampled verdicts.
    pub confidence: f64,
    /// Wall-clock time spent evaluating, in milliseconds. Always `>= 1`.
    pub processing_time_ms: u64,
    /// The inference provider that produced this decision, if `action` came
    /// from a `sample` rule.
    #[serde(default)]
    pub provider: Option<String>,
    /// Free-form risk factors surfaced by the provider or rule, for audit
    /// and UI display.
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl Decision {
    /// Build the fail-closed default decision: deny, no matching rule, full
    /// confidence, attributing the reason given.
    #[must_use]
    pub fn fail_closed(reason: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            action: DecisionAction::Deny,
            reason: reason.into(),
            rule_id: None,
            confidence: 1.0,
            processing_time_ms: processing_time_ms.max(1),
            provider: None,
            risk_factors: vec![],
        }
    }

    /// Whether this decision permits the tool call to proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.action == DecisionAction::Allow
    }
}
