//! A registry of named component health reports, aggregated with
//! `superego_core::health::aggregate`'s worst-of rule.
//!
//! A `DashMap`-backed table of [`HealthStatus`] values, one per named
//! component — many independent writers, no global lock.

use dashmap::DashMap;
use superego_core::{aggregate_health, HealthState, HealthStatus};

/// A component that never reported is treated as unhealthy, not absent —
/// fail-closed, matching the rest of the gateway's posture.
const NEVER_REPORTED: HealthState = HealthState::Unhealthy;

/// Tracks the most recently reported health of each named component
/// (`"policy_engine"`, `"inference:cli"`, `"audit_log"`, ...).
#[derive(Default)]
pub struct HealthRegistry {
    statuses: DashMap<String, HealthStatus>,
}

impl HealthRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) a component's current health.
    pub fn report(&self, status: HealthStatus) {
        if status.state != HealthState::Healthy {
            tracing::warn!(component = %status.component, state = ?status.state, message = %status.message, "component health degraded");
        }
        self.statuses.insert(status.component.clone(), status);
    }

    /// Convenience: report `component` as healthy.
    pub fn report_healthy(&self, component: impl Into<String>) {
        self.report(HealthStatus::healthy(component));
    }

    /// Look up a single component's last-reported status.
    #[must_use]
    pub fn status_of(&self, component: &str) -> Option<HealthStatus> {
        self.statuses.get(component).map(|r| r.value().clone())
    }

    /// Snapshot every component's current status.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HealthStatus> {
        self.statuses.iter().map(|r| r.value().clone()).collect()
    }

    /// Aggregate overall system health: worst-of across every reported
    /// component. An empty registry (nothing has reported yet) is
    /// unhealthy, matching `superego_core::health::aggregate`'s own
    /// fail-closed default for an empty slice.
    #[must_use]
    pub fn overall(&self) -> HealthState {
        if self.statuses.is_empty() {
            return NEVER_REPORTED;
        }
        let snapshot = self.snapshot();
        aggregate_health(&snapshot)
    }
}
