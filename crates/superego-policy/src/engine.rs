//! The security policy engine: fail-closed, priority-ordered rule
//! evaluation.
//!
//! Precedence, in order:
//! 1. No rules loaded yet → fail-closed `Deny` ([`Decision::fail_closed`]).
//! 2. Every matching rule is collected; the winner is the one with the
//!    numerically smallest `(priority, id)` pair — lower priority number
//!    wins, ties broken lexicographically by `id` alone (never by action
//!    "restrictiveness" — an `allow` rule with a smaller id beats a `deny`
//!    rule at the same priority).
//! 3. No rule matches → default `Deny`, `reason = "no rule matched"`,
//!    `confidence = 0.6`.
//! 4. A matched `Sample` rule calls out to the configured
//!    [`superego_inference::StrategyManager`] through a
//!    [`superego_breaker::CircuitBreaker`]; provider failure (including an
//!    open breaker or a timeout) fails closed to `Deny` at `confidence =
//!    0.5` — never to `Ask` or silently to `Allow`. A provider that
//!    *succeeds* and itself returns an `Ask` verdict (e.g. host-sampling
//!    with no attached human) is passed through unchanged.

use std::sync::Arc;
use std::time::Duration;
use superego_breaker::CircuitBreaker;
use superego_core::rule::{RuleAction, RuleSet, SecurityRule};
use superego_core::{Decision, DecisionAction, ToolRequest};
use superego_inference::StrategyManager;
use superego_pattern::Engine as PatternEngine;
use superego_sanitize::PromptBuilder;

use crate::observer::notify;

/// How long a `sample` rule's provider call is allowed to run before the
/// circuit breaker counts it as a failure.
const SAMPLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default confidence attached to the built-in "no rule matched" decision.
const NO_MATCH_CONFIDENCE: f64 = 0.6;

/// The deterministic, fail-closed policy engine.
pub struct Engine {
    rules: arc_swap::ArcSwap<RuleSet>,
    patterns: PatternEngine,
    prompts: PromptBuilder,
    providers: StrategyManager,
    breaker: Arc<CircuitBreaker>,
}

impl Engine {
    /// Build an engine with no rules loaded; every evaluation fails closed
    /// until [`Engine::swap_rules`] installs a validated [`RuleSet`].
    #[must_use]
    pub fn new(providers: StrategyManager, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            rules: arc_swap::ArcSwap::from_pointee(RuleSet::new(Vec::new())),
            patterns: PatternEngine::new(),
            prompts: PromptBuilder::default(),
            providers,
            breaker,
        }
    }

    /// Atomically replace the active rule set and flush pattern caches
    /// (compiled patterns are keyed by `(dialect, pattern)` text, not rule
    /// identity, but a flush avoids serving a stale result-cache entry for
    /// a pattern whose rule was just removed).
    pub fn swap_rules(&self, rules: RuleSet) {
        self.rules.store(Arc::new(rules));
        self.patterns.flush_caches();
    }

    /// Whether any rule is currently loaded.
    #[must_use]
    pub fn rules_loaded(&self) -> bool {
        !self.rules.load().is_empty()
    }

    /// Number of rules in the currently active snapshot.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.load().len()
    }

    /// Release every registered inference provider's resources. Called
    /// once, on gateway shutdown.
    pub async fn cleanup_providers(&self) {
        self.providers.cleanup_all().await;
    }

    /// Evaluate `request` against the active rule set.
    pub async fn evaluate(&self, request: &ToolRequest) -> Decision {
        let start = std::time::Instant::now();
        let snapshot = self.rules.load();

        if snapshot.is_empty() {
            let decision =
                Decision::fail_closed("no rules loaded", start.elapsed().as_millis() as u64);
            notify(request, &decision);
            return decision;
        }

        // `snapshot.rules()` is already sorted `(priority asc, id asc)` by
        // `RuleSet::new`, so the first match is the winner — no need to
        // collect and re-rank candidates. A condition that fails to
        // evaluate (e.g. an oversized match input) must not let matching
        // silently fall through to a lower-priority rule, since that rule
        // may be less restrictive than the one that couldn't be checked;
        // fail the whole request closed instead.
        let mut matched: Option<&SecurityRule> = None;
        for rule in snapshot.rules().iter() {
            match self.patterns.match_conditions(&rule.conditions, request) {
                Ok((true, _)) => {
                    matched = Some(rule);
                    break;
                }
                Ok((false, _)) => {}
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "rule condition evaluation failed");
                    let decision = Decision {
                        action: DecisionAction::Deny,
                        reason: format!("rule '{}' condition evaluation failed: {e}", rule.id),
                        rule_id: Some(rule.id.clone()),
                        confidence: 1.0,
                        processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                        provider: None,
                        risk_factors: vec![],
                    };
                    notify(request, &decision);
                    return decision;
                }
            }
        }

        let decision = match matched {
            None => Decision {
                action: DecisionAction::Deny,
                reason: "no rule matched".to_string(),
                rule_id: None,
                confidence: NO_MATCH_CONFIDENCE,
                processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                provider: None,
                risk_factors: vec![],
            },
            Some(rule) => self.decide_for_rule(rule, request, start).await,
        };

        notify(request, &decision);
        decision
    }

    async fn decide_for_rule(
        &self,
        rule: &SecurityRule,
        request: &ToolRequest,
        start: std::time::Instant,
    ) -> Decision {
        match rule.action {
            RuleAction::Allow => Decision {
                action: DecisionAction::Allow,
                reason: rule.reason_or_default(),
                rule_id: Some(rule.id.clone()),
                confidence: 1.0,
                processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                provider: None,
                risk_factors: rule.tags.clone(),
            },
            RuleAction::Deny => Decision {
                action: DecisionAction::Deny,
                reason: rule.reason_or_default(),
                rule_id: Some(rule.id.clone()),
                confidence: 1.0,
                processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                provider: None,
                risk_factors: rule.tags.clone(),
            },
            RuleAction::Sample => {
                let prompt = self.prompts.build_evaluation_prompt(request, rule);
                let providers = &self.providers;
                let result = self
                    .breaker
                    .call(SAMPLE_TIMEOUT, || providers.evaluate(rule, request, &prompt))
                    .await;
                match result {
                    Ok(mut decision) => {
                        decision.rule_id = Some(rule.id.clone());
                        decision.processing_time_ms =
                            start.elapsed().as_millis().max(1) as u64;
                        decision
                    }
                    Err(e) => {
                        tracing::warn!(rule = %rule.id, error = %e, "sample provider unavailable, failing closed");
                        Decision {
                            action: DecisionAction::Deny,
                            reason: "inference unavailable; denied for safety".to_string(),
                            rule_id: Some(rule.id.clone()),
                            confidence: 0.5,
                            processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                            provider: None,
                            risk_factors: rule.tags.clone(),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use superego_breaker::BreakerConfig;
    use superego_core::rule::{Conditions, ConditionLeaf};

    fn rule(id: &str, priority: u16, action: RuleAction, pattern: &str) -> SecurityRule {
        let mut conditions = Conditions::default();
        conditions.tool_name = Some(ConditionLeaf::Bare(pattern.to_string()));
        SecurityRule {
            id: id.to_string(),
            reason: Some(format!("rule {id}")),
            priority,
            conditions,
            action,
            provider: None,
            sampling_guidance: None,
            tags: vec![],
        }
    }

    fn engine() -> Engine {
        Engine::new(StrategyManager::new(), Arc::new(CircuitBreaker::new(BreakerConfig::default())))
    }

    #[tokio::test]
    async fn fails_closed_with_no_rules() {
        let engine = engine();
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        let decision = engine.evaluate(&req).await;
        assert_eq!(decision.action, DecisionAction::Deny);
    }

    #[tokio::test]
    async fn defaults_to_deny_when_no_rule_matches() {
        let engine = engine();
        engine.swap_rules(RuleSet::new(vec![rule("r1", 10, RuleAction::Deny, "delete_file")]));
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        let decision = engine.evaluate(&req).await;
        assert_eq!(decision.action, DecisionAction::Deny);
        assert_eq!(decision.reason, "no rule matched");
        assert!((decision.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn lower_priority_number_wins() {
        let engine = engine();
        engine.swap_rules(RuleSet::new(vec![
            rule("allow-it", 10, RuleAction::Allow, "write_file"),
            rule("deny-it", 5, RuleAction::Deny, "write_file"),
        ]));
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        let decision = engine.evaluate(&req).await;
        assert_eq!(decision.action, DecisionAction::Deny);
        assert_eq!(decision.rule_id.as_deref(), Some("deny-it"));
    }

    /// Equal priority, ties broken purely by ascending `id` — the `allow`
    /// rule wins here because `"a"` < `"b"`, regardless of which action
    /// is "more restrictive".
    #[tokio::test]
    async fn equal_priority_ties_broken_by_ascending_id() {
        let engine = engine();
        engine.swap_rules(RuleSet::new(vec![
            rule("a", 10, RuleAction::Allow, "ls"),
            rule("b", 10, RuleAction::Deny, "ls"),
        ]));
        let req = ToolRequest::new("ls", json!({}), "/tmp", "s", "a").unwrap();
        let decision = engine.evaluate(&req).await;
        assert_eq!(decision.action, DecisionAction::Allow);
        assert_eq!(decision.rule_id.as_deref(), Some("a"));
    }

    /// With no provider able to service a `sample` rule, the engine fails
    /// closed to `deny` at confidence 0.5 rather than escalating to `ask`.
    #[tokio::test]
    async fn sample_rule_without_provider_fails_closed_to_deny() {
        let engine = engine();
        engine.swap_rules(RuleSet::new(vec![rule(
            "sample-it",
            10,
            RuleAction::Sample,
            "write_file",
        )]));
        let req = ToolRequest::new("write_file", json!({}), "/tmp", "s", "a").unwrap();
        let decision = engine.evaluate(&req).await;
        assert_eq!(decision.action, DecisionAction::Deny);
        assert!((decision.confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(decision.reason, "inference unavailable; denied for safety");
    }
}
