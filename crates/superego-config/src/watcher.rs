//! Watches the rules file for changes and atomically swaps a validated
//! `RuleSet` into the running policy engine.
//!
//! `notify` is used for filesystem watching (see `DESIGN.md` for why it
//! was added). Debounce is implemented by coalescing rapid `notify`
//! events behind a `tokio::time::sleep` — only the newest event after a
//! quiet period is acted on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecursiveMode, Watcher};
use superego_policy::{load::parse_and_validate, Engine};
use tokio::sync::mpsc;

/// Minimum quiet period after the last filesystem event before a reload is
/// attempted, coalescing bursts of writes (e.g. an editor's save-as-temp-
/// then-rename sequence) into a single reload.
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches `rules_path` for changes and keeps `engine`'s active rule set in
/// sync, validating every candidate file fully before swapping it in.
///
/// On an invalid candidate file, the current snapshot is retained and the
/// failure is logged; the caller is expected to surface the degraded state
/// (e.g. via `superego-telemetry::HealthRegistry`) through `on_result`.
pub struct RulesWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl RulesWatcher {
    /// Start watching `rules_path`. `on_result` is invoked after every
    /// reload attempt (success or failure), letting the caller update a
    /// health registry or broadcast an SSE event.
    ///
    /// # Errors
    /// Returns a `notify::Error` if the underlying OS file watch cannot be
    /// established (e.g. the path's parent directory does not exist).
    pub fn start(
        rules_path: PathBuf,
        engine: Arc<Engine>,
        on_result: impl Fn(Result<usize, String>) + Send + 'static,
    ) -> notify::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if res.is_ok() {
                let _ = tx.send(());
            }
        })?;
        watcher.watch(&rules_path, RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Drain any further events that arrive within the debounce
                // window so a burst of writes triggers one reload.
                loop {
                    match tokio::time::timeout(DEBOUNCE, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                let result = reload(&rules_path, &engine).await;
                on_result(result);
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

async fn reload(rules_path: &Path, engine: &Arc<Engine>) -> Result<usize, String> {
    let contents = tokio::fs::read(rules_path)
        .await
        .map_err(|e| format!("failed to read rules file: {e}"))?;
    let rule_set = parse_and_validate(contents.as_slice())?;
    let count = rule_set.len();
    engine.swap_rules(rule_set);
    tracing::info!(rules_path = %rules_path.display(), rule_count = count, "rules file reloaded");
    Ok(count)
}

/// Perform a single, synchronous load-and-validate-and-swap without
/// starting a watcher — used at process startup before the watcher takes
/// over for subsequent changes.
///
/// # Errors
/// Returns a description of the failure if the file cannot be read or does
/// not parse/validate as a rules file.
pub async fn load_once(rules_path: &Path, engine: &Engine) -> Result<usize, String> {
    let contents = tokio::fs::read(rules_path)
        .await
        .map_err(|e| format!("failed to read rules file: {e}"))?;
    let rule_set = parse_and_validate(contents.as_slice())?;
    let count = rule_set.len();
    engine.swap_rules(rule_set);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use superego_breaker::{BreakerConfig, CircuitBreaker};
    use superego_inference::StrategyManager;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::new(StrategyManager::new(), Arc::new(CircuitBreaker::new(BreakerConfig::default()))))
    }

    #[tokio::test]
    async fn load_once_installs_valid_rules() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rules:\n  - id: r1\n    conditions:\n      tool_name: {{type: string, value: ls}}\n    action: allow\n"
        )
        .unwrap();
        let engine = engine();
        let count = load_once(file.path(), &engine).await.unwrap();
        assert_eq!(count, 1);
        assert!(engine.rules_loaded());
    }

    #[tokio::test]
    async fn load_once_rejects_invalid_rules_without_touching_engine() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rules:\n  - id: r1\n    conditions: {{}}\n    action: allow\n").unwrap();
        let engine = engine();
        let result = load_once(file.path(), &engine).await;
        assert!(result.is_err());
        assert!(!engine.rules_loaded());
    }

    #[tokio::test]
    async fn watcher_reloads_on_file_change() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rules:\n  - id: r1\n    conditions:\n      tool_name: {{type: string, value: ls}}\n    action: allow\n"
        )
        .unwrap();
        let engine = engine();
        load_once(file.path(), &engine).await.unwrap();

        let reload_count = Arc::new(AtomicUsize::new(0));
        let counter = reload_count.clone();
        let _watcher = RulesWatcher::start(file.path().to_path_buf(), engine.clone(), move |result| {
            if result.is_ok() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        writeln!(
            file,
            "rules:\n  - id: r1\n    conditions:\n      tool_name: {{type: string, value: ls}}\n    action: deny\n  - id: r2\n    conditions:\n      tool_name: {{type: string, value: cat}}\n    action: allow\n"
        )
        .unwrap();
        file.flush().unwrap();

        tokio::time::sleep(DEBOUNCE * 3).await;
        assert!(reload_count.load(Ordering::SeqCst) >= 1);
        assert_eq!(engine.rule_count(), 2);
    }
}
