//! Optional in-process observation of policy decisions, following an
//! observer/global-metrics pattern.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use superego_core::{Decision, ToolRequest};

/// Observer invoked for every decision the engine produces. Implementations
/// must be cheap and non-blocking; this hook is intended for tests and
/// in-process metrics, not I/O.
pub trait PolicyObserver: Send + Sync {
    /// Called once per evaluation, after the decision has been made.
    fn on_decision(&self, request: &ToolRequest, decision: &Decision);
}

static OBSERVER: OnceLock<RwLock<Option<Arc<dyn PolicyObserver>>>> = OnceLock::new();

/// Install or clear the global policy observer.
pub fn set_observer(observer: Option<Box<dyn PolicyObserver>>) {
    let cell = OBSERVER.get_or_init(|| RwLock::new(None));
    let mut guard = cell.write().expect("observer lock poisoned");
    *guard = observer.map(Arc::from);
}

pub(crate) fn notify(request: &ToolRequest, decision: &Decision) {
    if let Some(lock) = OBSERVER.get() {
        if let Ok(guard) = lock.read() {
            if let Some(observer) = guard.as_ref() {
                observer.on_decision(request, decision);
            }
        }
    }
    policy_metrics().inc(decision.action);
}

/// Low-cardinality in-process counters keyed by decision action.
#[derive(Default)]
pub struct PolicyMetrics {
    inner: Mutex<HashMap<&'static str, u64>>,
}

impl PolicyMetrics {
    /// Current count for `action` (`"allow"`, `"deny"`, or `"ask"`).
    #[must_use]
    pub fn count(&self, action: &str) -> u64 {
        self.inner.lock().expect("metrics lock poisoned").get(action).copied().unwrap_or(0)
    }

    fn inc(&self, action: superego_core::DecisionAction) {
        let key = match action {
            superego_core::DecisionAction::Allow => "allow",
            superego_core::DecisionAction::Deny => "deny",
            superego_core::DecisionAction::Ask => "ask",
        };
        *self.inner.lock().expect("metrics lock poisoned").entry(key).or_insert(0) += 1;
    }
}

static METRICS: OnceLock<PolicyMetrics> = OnceLock::new();

/// The global policy decision counters.
pub fn policy_metrics() -> &'static PolicyMetrics {
    METRICS.get_or_init(PolicyMetrics::default)
}
