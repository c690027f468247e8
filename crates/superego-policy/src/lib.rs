//! Fail-closed security policy engine: rule matching, priority precedence,
//! and `sample` dispatch to inference providers behind a circuit breaker.

pub mod engine;
pub mod load;
pub mod observer;

pub use engine::Engine;
pub use load::{parse_and_validate, RuleDef, RulesFile};
pub use observer::{policy_metrics, set_observer, PolicyMetrics, PolicyObserver};
