//! Shared data model and error taxonomy for the Superego gateway.
//!
//! Every other workspace crate depends on this one for the types that cross
//! crate boundaries: [`ToolRequest`], [`SecurityRule`]/[`RuleSet`],
//! [`Decision`], [`AuditEntry`], and [`HealthStatus`], plus the [`Error`]
//! type used for fallible APIs throughout the workspace.

pub mod audit;
pub mod condition;
pub mod decision;
pub mod error;
pub mod health;
pub mod ids;
pub mod param;
pub mod request;
pub mod rule;
pub mod sanitize;

pub use audit::AuditEntry;
pub use condition::{ConditionLeaf, Conditions, TimeRange, TypedLeaf};
pub use decision::{Decision, DecisionAction};
pub use error::{Error, ErrorKind};
pub use health::{aggregate as aggregate_health, HealthState, HealthStatus};
pub use param::ParamValue;
pub use request::ToolRequest;
pub use rule::{RuleAction, RuleSet, SecurityRule};
