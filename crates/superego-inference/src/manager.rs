//! Holds every configured provider and resolves, per rule, which one(s) to
//! try, in what order, with fallback.
//!
//! The fallback loop walks an ordered-retry shape across *distinct
//! providers* rather than repeating one closure.

use crate::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use superego_core::rule::SecurityRule;
use superego_core::{Decision, Error, ErrorKind, HealthStatus, ToolRequest};

/// Owns the provider registry and the default fallback order.
#[derive(Clone, Default)]
pub struct StrategyManager {
    providers: HashMap<String, Arc<dyn Provider>>,
    fallback_order: Vec<String>,
}

impl StrategyManager {
    /// Build an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self { providers: HashMap::new(), fallback_order: Vec::new() }
    }

    /// Register a provider and append it to the default fallback order.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        self.fallback_order.push(name.clone());
        self.providers.insert(name, provider);
    }

    /// Explicitly set the fallback preference order (provider names).
    /// Names not present in the registry are silently skipped at evaluation
    /// time rather than rejected here, so configuration can be updated
    /// independently of provider registration.
    pub fn set_fallback_order(&mut self, order: Vec<String>) {
        self.fallback_order = order;
    }

    /// Evaluate `request` for a `sample` rule. If `rule.provider` is set
    /// (pinned), only that provider is tried; otherwise every provider in
    /// the fallback order is tried in turn until one succeeds.
    pub async fn evaluate(
        &self,
        rule: &SecurityRule,
        request: &ToolRequest,
        prompt: &str,
    ) -> Result<Decision, Error> {
        let order: Vec<&str> = if let Some(pinned) = &rule.provider {
            vec![pinned.as_str()]
        } else {
            self.fallback_order.iter().map(String::as_str).collect()
        };

        let mut last_error: Option<Error> = None;
        for name in order {
            let Some(provider) = self.providers.get(name) else { continue };

            // §4.F: "skip if provider not initialized or last health check
            // was unhealthy". Providers have no persistent "initialized"
            // flag of their own, so an on-demand health check stands in for
            // both conditions here.
            if provider.health_check().await.state == superego_core::HealthState::Unhealthy {
                tracing::warn!(provider = name, "provider unhealthy, skipping");
                continue;
            }

            match provider.evaluate(request, prompt).await {
                Ok(decision) => return Ok(decision),
                Err(e) => {
                    tracing::warn!(provider = name, error = %e, "provider failed, trying fallback");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::new(ErrorKind::InferenceUnavailable, "no inference provider configured")
        }))
    }

    /// Health of every registered provider.
    pub async fn health(&self) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(self.providers.len());
        for provider in self.providers.values() {
            out.push(provider.health_check().await);
        }
        out
    }

    /// Call `initialize()` on every registered provider, in parallel.
    /// Initialization and cleanup are explicit: a provider that fails to
    /// initialize stays registered (so a later fallback attempt still
    /// surfaces its error rather than silently vanishing from the order)
    /// but is logged loudly at startup.
    pub async fn initialize_all(&self) {
        let futures = self.providers.values().map(|provider| {
            let provider = provider.clone();
            async move {
                if let Err(e) = provider.initialize().await {
                    tracing::warn!(provider = provider.name(), error = %e, "provider failed to initialize");
                }
            }
        });
        futures_util::future::join_all(futures).await;
    }

    /// Call `cleanup()` on every registered provider, in parallel. Used on
    /// gateway shutdown, alongside the other shutdown-path work.
    pub async fn cleanup_all(&self) {
        let futures = self.providers.values().map(|provider| {
            let provider = provider.clone();
            async move {
                if let Err(e) = provider.cleanup().await {
                    tracing::warn!(provider = provider.name(), error = %e, "provider cleanup failed");
                }
            }
        });
        futures_util::future::join_all(futures).await;
    }
}
