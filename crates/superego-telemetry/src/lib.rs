//! Structured logging initialization and component health aggregation.

pub mod health;
pub mod logging;

pub use health::HealthRegistry;
pub use logging::{init_tracing, LogTarget};
