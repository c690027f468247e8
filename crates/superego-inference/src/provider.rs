//! The `Provider` trait implemented by every inference backend.

use async_trait::async_trait;
use superego_core::{Decision, Error, HealthStatus, ToolRequest};

/// Static self-description a provider reports for health/status endpoints.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Stable provider name, matching `Provider::name`.
    pub name: String,
    /// Backend kind (`"mock"`, `"cli"`, `"host-sampling"`).
    pub kind: String,
    /// Model identifiers this provider can dispatch to, if meaningful for
    /// its kind (empty for providers with no model concept, e.g. `mock`).
    pub models: Vec<String>,
    /// Free-form capability tags (e.g. `"offline"`, `"subprocess"`,
    /// `"human-in-the-loop"`).
    pub capabilities: Vec<String>,
}

/// A source of allow/deny/ask verdicts for `sample` rules.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable name used in rule pinning (`SecurityRule::provider`) and in
    /// `Decision::provider`.
    fn name(&self) -> &str;

    /// Prepare the provider for use (e.g. spawn a long-lived subprocess).
    /// Called once before the provider accepts requests.
    async fn initialize(&self) -> Result<(), Error>;

    /// Evaluate `request` and return a decision. `prompt` is the rendered
    /// evaluation prompt built by `superego_sanitize::PromptBuilder`.
    async fn evaluate(&self, request: &ToolRequest, prompt: &str) -> Result<Decision, Error>;

    /// Report this provider's own health, independent of any particular
    /// evaluation.
    async fn health_check(&self) -> HealthStatus;

    /// Static self-description, surfaced in health/status endpoints.
    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            kind: "unknown".to_string(),
            models: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    /// Release any resources held (subprocess, connections). Called on
    /// shutdown.
    async fn cleanup(&self) -> Result<(), Error> {
        Ok(())
    }
}
