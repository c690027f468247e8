//! Shared application state, handed to every transport front end.
//!
//! A single `Arc<AppState>` behind every handler, holding the handful of
//! shared gateway services every surface (HTTP, WS, SSE, stdio) dispatches
//! through.

use std::sync::Arc;

use superego_audit::AuditLog;
use superego_core::ToolRequest;
use superego_policy::Engine;
use superego_telemetry::HealthRegistry;
use tokio::sync::{broadcast, RwLock};

/// An event published on the broadcast channel SSE streams subscribe to.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum GatewayEvent {
    /// Overall health changed.
    Health(superego_core::HealthState),
    /// An entry was appended to the audit log.
    Audit(superego_core::AuditEntry),
    /// The active rule set changed (either count or an error).
    Config {
        /// Whether the change was applied.
        ok: bool,
        /// Human-readable detail (rule count, or the validation failure).
        detail: String,
    },
}

/// Capacity of the broadcast channel backing SSE streams; a slow SSE
/// subscriber simply misses older events once full (`broadcast::Sender`'s
/// own lagged-receiver semantics), it never blocks a publisher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything a transport handler needs to serve a request.
pub struct AppState {
    /// The fail-closed policy engine.
    pub engine: Arc<Engine>,
    /// The in-memory audit log.
    pub audit: Arc<AuditLog>,
    /// Aggregated component health.
    pub health: Arc<HealthRegistry>,
    /// Raw text of the currently active rules file, served verbatim by
    /// `GET /v1/config/rules`.
    pub rules_text: RwLock<String>,
    /// Publishes [`GatewayEvent`]s for SSE subscribers.
    pub events: broadcast::Sender<GatewayEvent>,
}

impl AppState {
    /// Build a new, empty application state.
    #[must_use]
    pub fn new(engine: Arc<Engine>, audit: Arc<AuditLog>, health: Arc<HealthRegistry>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { engine, audit, health, rules_text: RwLock::new(String::new()), events }
    }

    /// Evaluate a request and append the (redacted) result to the audit
    /// log, publishing an audit event for SSE subscribers. This is the one
    /// evaluation entrypoint every transport surface calls through.
    pub async fn evaluate(&self, request: ToolRequest) -> superego_core::Decision {
        let decision = self.engine.evaluate(&request).await;
        let matched_rule_ids = decision.rule_id.iter().cloned().collect();
        self.audit.append(request, decision.clone(), matched_rule_ids);
        if let Some(entry) = self.audit.recent(1).into_iter().next() {
            let _ = self.events.send(GatewayEvent::Audit(entry));
        }
        decision
    }

    /// Replace the served rules text and the health/config event stream
    /// after a hot reload.
    pub async fn set_rules_text(&self, text: String) {
        *self.rules_text.write().await = text;
    }

    /// Publish a config-change event (called by the reload watcher).
    pub fn publish_config_change(&self, ok: bool, detail: impl Into<String>) {
        let _ = self.events.send(GatewayEvent::Config { ok, detail: detail.into() });
    }

    /// Publish a health-change event.
    pub fn publish_health_change(&self, state: superego_core::HealthState) {
        let _ = self.events.send(GatewayEvent::Health(state));
    }
}
