//! End-to-end scenario tests exercising the gateway's library crates the
//! way the `advisor`/`serve` binary wires them together, without spawning
//! the compiled binary itself.

use std::sync::Arc;

use serde_json::json;

use superego_audit::AuditLog;
use superego_breaker::{BreakerConfig, CircuitBreaker};
use superego_core::rule::{ConditionLeaf, Conditions, RuleAction, RuleSet, SecurityRule};
use superego_core::{DecisionAction, ToolRequest};
use superego_hooks::{parse_hook_input, HookOutput};
use superego_inference::{MockProvider, StrategyManager};
use superego_policy::{parse_and_validate, Engine};

/// The ruleset shipped at the workspace root, loaded exactly as
/// `superego-config::load_once` would at startup.
const DEFAULT_RULES_YAML: &str = include_str!("../../../rules.yaml");

fn engine_with_default_rules() -> Engine {
    let mut providers = StrategyManager::new();
    providers.register(Arc::new(MockProvider));
    let engine = Engine::new(providers, Arc::new(CircuitBreaker::new(BreakerConfig::default())));
    let rules = parse_and_validate(DEFAULT_RULES_YAML.as_bytes()).expect("default rules.yaml is valid");
    engine.swap_rules(rules);
    engine
}

/// S1: a safe, read-only tool call is allowed.
#[tokio::test]
async fn s1_safe_read_is_allowed() {
    let engine = engine_with_default_rules();
    let input = r#"{"session_id":"s1","transcript_path":"","cwd":"/tmp","hook_event_name":"PreToolUse","tool_name":"read_file","tool_input":{"path":"./README.md"}}"#;

    let request = parse_hook_input(input).expect("valid hook input");
    let decision = engine.evaluate(&request).await;
    let output = HookOutput::from_decision(&decision);

    assert_eq!(decision.action, DecisionAction::Allow);
    assert_eq!(output.decision, "approve");
}

/// S2: a dangerous shell command is denied, and the reason mentions why.
#[tokio::test]
async fn s2_dangerous_shell_command_is_denied() {
    let engine = engine_with_default_rules();
    let input = r#"{"session_id":"s2","transcript_path":"","cwd":"/tmp","hook_event_name":"PreToolUse","tool_name":"bash","tool_input":{"command":"rm -rf /"}}"#;

    let request = parse_hook_input(input).expect("valid hook input");
    let decision = engine.evaluate(&request).await;
    let output = HookOutput::from_decision(&decision);

    assert_eq!(decision.action, DecisionAction::Deny);
    assert_eq!(output.decision, "block");
    assert!(
        decision.reason.to_lowercase().contains("dangerous"),
        "reason was: {}",
        decision.reason
    );
}

/// S3: equal priority is broken purely by ascending rule id, independent
/// of which action "sounds" more restrictive.
#[tokio::test]
async fn s3_priority_ties_break_on_ascending_id() {
    let mut allow_cond = Conditions::default();
    allow_cond.tool_name = Some(ConditionLeaf::Bare("ls".to_string()));
    let mut deny_cond = Conditions::default();
    deny_cond.tool_name = Some(ConditionLeaf::Bare("ls".to_string()));

    let rules = RuleSet::new(vec![
        SecurityRule {
            id: "a-allow".to_string(),
            reason: Some("allow ls".to_string()),
            priority: 10,
            conditions: allow_cond,
            action: RuleAction::Allow,
            provider: None,
            sampling_guidance: None,
            tags: vec![],
        },
        SecurityRule {
            id: "b-deny".to_string(),
            reason: Some("deny ls".to_string()),
            priority: 10,
            conditions: deny_cond,
            action: RuleAction::Deny,
            provider: None,
            sampling_guidance: None,
            tags: vec![],
        },
    ]);

    let engine = Engine::new(StrategyManager::new(), Arc::new(CircuitBreaker::new(BreakerConfig::default())));
    engine.swap_rules(rules);

    let request = ToolRequest::new("ls", json!({}), "/tmp", "s3", "a3").unwrap();
    let decision = engine.evaluate(&request).await;
    assert_eq!(decision.action, DecisionAction::Allow);
    assert_eq!(decision.rule_id.as_deref(), Some("a-allow"));
}

/// S4: a rules hot-swap mid-flight never produces a decision inconsistent
/// with either the before- or after-swap snapshot.
#[tokio::test]
async fn s4_hot_reload_is_atomic_under_concurrent_evaluation() {
    let mut deny_cond = Conditions::default();
    deny_cond.tool_name = Some(ConditionLeaf::Bare("probe".to_string()));
    let rules_v1 = RuleSet::new(vec![SecurityRule {
        id: "probe-rule".to_string(),
        reason: Some("v1: deny probe".to_string()),
        priority: 10,
        conditions: deny_cond,
        action: RuleAction::Deny,
        provider: None,
        sampling_guidance: None,
        tags: vec![],
    }]);

    let mut allow_cond = Conditions::default();
    allow_cond.tool_name = Some(ConditionLeaf::Bare("probe".to_string()));
    let rules_v2 = RuleSet::new(vec![SecurityRule {
        id: "probe-rule".to_string(),
        reason: Some("v2: allow probe".to_string()),
        priority: 10,
        conditions: allow_cond,
        action: RuleAction::Allow,
        provider: None,
        sampling_guidance: None,
        tags: vec![],
    }]);

    let engine = Arc::new(Engine::new(
        StrategyManager::new(),
        Arc::new(CircuitBreaker::new(BreakerConfig::default())),
    ));
    engine.swap_rules(rules_v1);

    let mut handles = Vec::new();
    for _ in 0..100 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let request = ToolRequest::new("probe", json!({}), "/tmp", "s4", "a4").unwrap();
            engine.evaluate(&request).await
        }));
    }
    engine.swap_rules(rules_v2);

    for handle in handles {
        let decision = handle.await.unwrap();
        // Whichever snapshot served the request, the action and reason must
        // agree: "probe-rule" never denies with the v2 reason or allows
        // with the v1 reason.
        match decision.action {
            DecisionAction::Deny => assert_eq!(decision.reason, "v1: deny probe"),
            DecisionAction::Allow => assert_eq!(decision.reason, "v2: allow probe"),
            DecisionAction::Ask => panic!("neither snapshot produces an ask verdict"),
        }
    }
}

/// S5: an inference provider that always errors fails closed to deny, and
/// the event is still recorded in the audit log.
#[tokio::test]
async fn s5_inference_failure_fails_closed_and_is_audited() {
    use async_trait::async_trait;
    use superego_core::{Error, HealthState, HealthStatus};
    use superego_inference::Provider;

    struct AlwaysFails;

    #[async_trait]
    impl Provider for AlwaysFails {
        fn name(&self) -> &str {
            "broken"
        }
        async fn initialize(&self) -> Result<(), Error> {
            Ok(())
        }
        async fn evaluate(
            &self,
            _request: &ToolRequest,
            _prompt: &str,
        ) -> Result<superego_core::Decision, Error> {
            Err(Error::internal("provider is down"))
        }
        async fn health_check(&self) -> HealthStatus {
            HealthStatus::new("inference:broken", HealthState::Healthy, "reports healthy but fails calls")
        }
    }

    let mut providers = StrategyManager::new();
    providers.register(Arc::new(AlwaysFails));

    let mut cond = Conditions::default();
    cond.tool_name = Some(ConditionLeaf::Bare("risky_call".to_string()));
    let rules = RuleSet::new(vec![SecurityRule {
        id: "sample-risky".to_string(),
        reason: Some("risky call needs review".to_string()),
        priority: 10,
        conditions: cond,
        action: RuleAction::Sample,
        provider: None,
        sampling_guidance: None,
        tags: vec![],
    }]);

    let engine = Engine::new(providers, Arc::new(CircuitBreaker::new(BreakerConfig::default())));
    engine.swap_rules(rules);

    let request = ToolRequest::new("risky_call", json!({}), "/tmp", "s5", "a5").unwrap();
    let decision = engine.evaluate(&request).await;

    assert_eq!(decision.action, DecisionAction::Deny);
    assert!((decision.confidence - 0.5).abs() < f64::EPSILON);

    let audit = AuditLog::default();
    audit.append(request, decision.clone(), decision.rule_id.clone().into_iter().collect());
    let entries = audit.recent(1);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].matched_rule_ids, vec!["sample-risky".to_string()]);
}

/// S6: a sensitive parameter value (an API key) is redacted before it is
/// ever stored in the audit log.
#[tokio::test]
async fn s6_sensitive_parameters_are_redacted_in_audit_log() {
    let engine = engine_with_default_rules();
    let request =
        ToolRequest::new("http_request", json!({"api_key": "sk-abcdef", "path": "/tmp/x"}), "/tmp", "s6", "a6")
            .unwrap();
    let decision = engine.evaluate(&request).await;

    let audit = AuditLog::default();
    audit.append(request, decision.clone(), decision.rule_id.into_iter().collect());
    let entries = audit.recent(1);

    let stored = entries[0].request.parameter("api_key").unwrap();
    assert_eq!(stored, &superego_core::ParamValue::Str(superego_sanitize::REDACTED_PLACEHOLDER.to_string()));
    let path = entries[0].request.parameter("path").unwrap();
    assert_eq!(path, &superego_core::ParamValue::Str("/tmp/x".to_string()));
}
