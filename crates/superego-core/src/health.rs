//! Component health reporting, aggregated by a worst-of-state rule.

use serde::{Deserialize, Serialize};

/// The health state of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Fully operational.
    Healthy,
    /// Operational but impaired (e.g. a provider fallback is in use).
    Degraded,
    /// Not operational.
    Unhealthy,
}

/// A single component's reported health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Component name (e.g. `"policy_engine"`, `"inference:cli"`).
    pub component: String,
    /// Current state.
    pub state: HealthState,
    /// Human-readable detail.
    pub message: String,
    /// When this status was last refreshed.
    pub last_check: chrono::DateTime<chrono::Utc>,
}

impl HealthStatus {
    /// Build a healthy status for `component` timestamped now.
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Healthy,
            message: "ok".to_string(),
            last_check: crate::ids::now(),
        }
    }

    /// Build a status of the given state and message for `component`,
    /// timestamped now.
    #[must_use]
    pub fn new(component: impl Into<String>, state: HealthState, message: impl Into<String>) -> Self {
        Self { component: component.into(), state, message: message.into(), last_check: crate::ids::now() }
    }
}

/// Aggregate the worst state across a set of component statuses.
///
/// An empty slice is reported `Unhealthy` (fail-closed: no component
/// reporting is treated as no evidence of health).
#[must_use]
pub fn aggregate(statuses: &[HealthStatus]) -> HealthState {
    statuses.iter().map(|s| s.state).max().unwrap_or(HealthState::Unhealthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_picks_worst_state() {
        let statuses = vec![
            HealthStatus::healthy("a"),
            HealthStatus::new("b", HealthState::Degraded, "slow"),
        ];
        assert_eq!(aggregate(&statuses), HealthState::Degraded);
    }

    #[test]
    fn empty_aggregate_is_unhealthy() {
        assert_eq!(aggregate(&[]), HealthState::Unhealthy);
    }

    #[test]
    fn unhealthy_dominates() {
        let statuses = vec![
            HealthStatus::healthy("a"),
            HealthStatus::new("b", HealthState::Degraded, "slow"),
            HealthStatus::new("c", HealthState::Unhealthy, "down"),
        ];
        assert_eq!(aggregate(&statuses), HealthState::Unhealthy);
    }
}
