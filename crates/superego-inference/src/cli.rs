//! Spawns a configured command-line evaluator as a subprocess, one
//! invocation per request.
//!
//! Uses an explicit `cwd`, an allowlisted environment rather than
//! inheriting the parent's, and `kill_on_drop` so a timed-out child (and
//! any of its own children) is reclaimed rather than orphaned. Retries
//! are bounded and apply to a single provider, not across providers.

use crate::provider::{Provider, ProviderInfo};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use superego_core::{Decision, DecisionAction, Error, ErrorKind, HealthState, HealthStatus, ToolRequest};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Configuration for a [`CliProvider`].
#[derive(Debug, Clone)]
pub struct CliProviderConfig {
    /// Stable provider name.
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Fixed argument template; the rendered prompt is written to the
    /// child's stdin rather than appended as an argument.
    pub args: Vec<String>,
    /// Names of environment variables whose current value (if set in this
    /// process's own environment) is forwarded to the child. `PATH` is
    /// always forwarded in addition to this list; every other variable is
    /// withheld by default, so the child inherits a sanitized environment
    /// rather than everything sensitive in the parent's.
    pub env_passthrough: Vec<String>,
    /// Working directory for the child process.
    pub cwd: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Number of attempts before giving up.
    pub attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for CliProviderConfig {
    fn default() -> Self {
        Self {
            name: "cli".to_string(),
            program: String::new(),
            args: Vec::new(),
            env_passthrough: Vec::new(),
            cwd: "/".to_string(),
            timeout: Duration::from_secs(10),
            attempts: 2,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Evaluates requests by spawning a configured external command and
/// feeding it the rendered prompt over stdin, expecting a single line of
/// `allow` / `deny` / `ask` (optionally followed by a reason) on stdout.
pub struct CliProvider {
    config: CliProviderConfig,
}

impl CliProvider {
    /// Build a new provider from its configuration.
    #[must_use]
    pub fn new(config: CliProviderConfig) -> Self {
        Self { config }
    }

    async fn run_once(&self, prompt: &str) -> Result<Decision, Error> {
        let start = std::time::Instant::now();
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args);
        cmd.current_dir(&self.config.cwd);
        cmd.env_clear();
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        for name in &self.config.env_passthrough {
            if let Ok(value) = std::env::var(name) {
                cmd.env(name, value);
            }
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::new(ErrorKind::InferenceUnavailable, format!("spawn failed: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(prompt.as_bytes()).await;
        }

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::new(ErrorKind::InferenceTimeout, "provider process timed out"))?
            .map_err(|e| Error::new(ErrorKind::InferenceUnavailable, format!("wait failed: {e}")))?;

        if !output.status.success() {
            return Err(Error::new(
                ErrorKind::InferenceUnavailable,
                format!("provider process exited with status {:?}", output.status.code()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_decision(&stdout, &self.config.name, start.elapsed().as_millis().max(1) as u64)
    }
}

/// The JSON line a CLI provider emits on stdout:
/// `{decision, confidence, reasoning, risk_factors}`.
#[derive(Debug, serde::Deserialize)]
struct CliVerdict {
    decision: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    risk_factors: Vec<String>,
}

/// Parse the first JSON-object line of `output` as a [`CliVerdict`] and
/// translate it into a [`Decision`]. Any parse failure or unrecognized
/// `decision` value is an error — CLI providers must fail closed, never
/// silently resolve to a default verdict.
fn parse_decision(output: &str, provider_name: &str, processing_time_ms: u64) -> Result<Decision, Error> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::new(ErrorKind::InferenceUnavailable, "provider produced no output"))?;
    let verdict: CliVerdict = serde_json::from_str(line).map_err(|e| {
        Error::new(ErrorKind::InferenceUnavailable, format!("malformed provider JSON: {e}"))
    })?;

    let action = match verdict.decision.to_lowercase().as_str() {
        "allow" => DecisionAction::Allow,
        "deny" => DecisionAction::Deny,
        "ask" => DecisionAction::Ask,
        other => {
            return Err(Error::new(
                ErrorKind::InferenceUnavailable,
                format!("provider returned unrecognized verdict '{other}'"),
            ))
        }
    };
    Ok(Decision {
        action,
        reason: verdict.reasoning.unwrap_or_else(|| "provider verdict".to_string()),
        rule_id: None,
        confidence: verdict.confidence.unwrap_or(0.8).clamp(0.0, 1.0),
        processing_time_ms,
        provider: Some(provider_name.to_string()),
        risk_factors: verdict.risk_factors,
    })
}

#[async_trait]
impl Provider for CliProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn evaluate(&self, _request: &ToolRequest, prompt: &str) -> Result<Decision, Error> {
        let mut remaining = self.config.attempts.max(1);
        loop {
            match self.run_once(prompt).await {
                Ok(decision) => return Ok(decision),
                Err(e) => {
                    remaining -= 1;
                    if remaining == 0 {
                        return Err(e);
                    }
                    tracing::warn!(provider = %self.config.name, error = %e, "cli provider attempt failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    async fn health_check(&self) -> HealthStatus {
        if self.config.program.is_empty() {
            return HealthStatus::new(
                format!("inference:{}", self.config.name),
                HealthState::Unhealthy,
                "no program configured",
            );
        }
        HealthStatus::healthy(format!("inference:{}", self.config.name))
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            kind: "cli".to_string(),
            models: vec![self.config.program.clone()],
            capabilities: vec!["subprocess".to_string()],
        }
    }
}
