//! Security rules and the immutable, priority-sorted snapshot they are
//! loaded into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use crate::condition::{ConditionLeaf, Conditions, TimeRange, TypedLeaf};

/// The action a matched rule prescribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Allow the tool call to proceed.
    Allow,
    /// Deny the tool call.
    Deny,
    /// Defer to an inference provider for an allow/deny/ask verdict.
    Sample,
}

/// A single security rule.
///
/// `priority` convention: lower numeric value wins (`0` is highest
/// precedence), clamped to `[0, 999]` at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRule {
    /// Stable rule identifier, unique within a `RuleSet`.
    pub id: String,
    /// Human-readable justification surfaced for the rule's allow/deny
    /// verdict and in audit entries. Falls back to a generated string via
    /// [`SecurityRule::reason_or_default`] when absent or blank, so a
    /// `Decision::reason` is never empty.
    #[serde(default)]
    pub reason: Option<String>,
    /// Precedence; lower wins. Clamped to `[0, 999]`.
    pub priority: u16,
    /// All conditions must match (logical AND) for the rule to apply.
    pub conditions: Conditions,
    /// The action to take when every condition matches.
    pub action: RuleAction,
    /// Optional pinned inference provider name, used only when
    /// `action == Sample`.
    #[serde(default)]
    pub provider: Option<String>,
    /// Free-form guidance text prepended to the inference prompt when
    /// `action == Sample`; ignored for `allow`/`deny` rules.
    #[serde(default)]
    pub sampling_guidance: Option<String>,
    /// Free-form tags surfaced in audit entries (e.g. `"filesystem"`,
    /// `"network"`).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SecurityRule {
    /// `priority` clamped into the valid `[0, 999]` range.
    #[must_use]
    pub fn clamped_priority(&self) -> u16 {
        self.priority.min(999)
    }

    /// `reason`, or a generated fallback (`"rule '<id>' matched"`) when
    /// absent or blank. A matched rule's `Decision::reason` must always be
    /// non-empty; this is the single place that guarantee is enforced.
    #[must_use]
    pub fn reason_or_default(&self) -> String {
        match &self.reason {
            Some(r) if !r.trim().is_empty() => r.clone(),
            _ => format!("rule '{}' matched", self.id),
        }
    }
}

/// An immutable, priority-sorted snapshot of the active rule set.
///
/// Rules are loaded once and sorted by `(priority, id)` so evaluation never
/// needs to re-sort; hot-reload (`superego-config`) builds a new `RuleSet`
/// and atomically swaps the `Arc` rather than mutating this one in place.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Arc<Vec<SecurityRule>>,
    by_id: Arc<BTreeMap<String, usize>>,
}

impl RuleSet {
    /// Build a new snapshot from an unordered rule list, sorting by
    /// `(priority, id)` ascending (lowest priority number first).
    #[must_use]
    pub fn new(mut rules: Vec<SecurityRule>) -> Self {
        rules.sort_by(|a, b| {
            a.clamped_priority().cmp(&b.clamped_priority()).then_with(|| a.id.cmp(&b.id))
        });
        let by_id = rules.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();
        Self { rules: Arc::new(rules), by_id: Arc::new(by_id) }
    }

    /// Rules in evaluation order (highest precedence first).
    #[must_use]
    pub fn rules(&self) -> &[SecurityRule] {
        &self.rules
    }

    /// Look up a rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SecurityRule> {
        self.by_id.get(id).map(|&i| &self.rules[i])
    }

    /// Number of rules in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the snapshot holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
