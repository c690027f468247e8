//! Pluggable inference: a common [`provider::Provider`] trait, three
//! implementations (built-in heuristic, external CLI process, host
//! round-trip), and a [`manager::StrategyManager`] that resolves fallback
//! order per rule.

pub mod cli;
pub mod host;
pub mod manager;
pub mod mock;
pub mod provider;

pub use cli::{CliProvider, CliProviderConfig};
pub use host::{HostSampleRequest, HostSamplingProvider};
pub use manager::StrategyManager;
pub use mock::MockProvider;
pub use provider::{Provider, ProviderInfo};
