//! A deterministic, built-in provider requiring no external process or
//! network access: simple string/regex matching over the request, never
//! sleeps, never errors.

use crate::provider::{Provider, ProviderInfo};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use superego_core::{Decision, DecisionAction, Error, HealthState, HealthStatus, ToolRequest};

static DESTRUCTIVE_COMMAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\brm\s+-rf\b|\bdd\s+if=|\bmkfs\b|\bsudo\b").expect("static regex is valid")
});

static SENSITIVE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(/etc/shadow|/etc/passwd|~/\.ssh/)").expect("static regex is valid")
});

/// A zero-dependency provider useful for tests, offline operation, and as
/// the last entry in a fallback chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockProvider;

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn evaluate(&self, request: &ToolRequest, _prompt: &str) -> Result<Decision, Error> {
        let start = std::time::Instant::now();

        let haystack: String = request
            .parameters()
            .values()
            .map(|v| v.to_json().to_string())
            .collect::<Vec<_>>()
            .join(" ");

        let is_destructive = DESTRUCTIVE_COMMAND_RE.is_match(&haystack)
            || DESTRUCTIVE_COMMAND_RE.is_match(request.tool_name());
        let is_sensitive_path = SENSITIVE_PATH_RE.is_match(&haystack);

        // Exactly two outcomes: a dangerous pattern (destructive command
        // or a well-known sensitive path) denies at high confidence,
        // otherwise it allows at moderate confidence — no third verdict.
        let decision = if is_destructive || is_sensitive_path {
            let risk_factor = if is_destructive { "destructive_command" } else { "sensitive_path" };
            Decision {
                action: DecisionAction::Deny,
                reason: "matched a known dangerous command or sensitive-path pattern".to_string(),
                rule_id: None,
                confidence: 0.95,
                processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                provider: Some(self.name().to_string()),
                risk_factors: vec![risk_factor.to_string()],
            }
        } else {
            Decision {
                action: DecisionAction::Allow,
                reason: "no built-in risk pattern matched".to_string(),
                rule_id: None,
                confidence: 0.5,
                processing_time_ms: start.elapsed().as_millis().max(1) as u64,
                provider: Some(self.name().to_string()),
                risk_factors: vec![],
            }
        };
        Ok(decision)
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::healthy("inference:mock")
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            kind: "mock".to_string(),
            models: Vec::new(),
            capabilities: vec!["offline".to_string(), "deterministic".to_string()],
        }
    }
}
