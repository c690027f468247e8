//! Layered configuration loading and rules-file hot-reload.

pub mod settings;
pub mod watcher;

pub use settings::{ConfigError, Settings};
pub use watcher::{load_once, RulesWatcher};
