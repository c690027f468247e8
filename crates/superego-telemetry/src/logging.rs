//! Structured logging initialization: a JSON `fmt` layer plus an
//! `EnvFilter`, parameterized by `SUPEREGO_LOG_LEVEL` instead of reading
//! only `RUST_LOG`, and able to target stderr for stdio transport mode
//! (stdout is reserved for the JSON-RPC wire protocol there).

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard out (the default for HTTP/server modes).
    Stdout,
    /// Standard error (required for stdio JSON-RPC mode, where stdout
    /// carries the wire protocol).
    Stderr,
}

/// Initialize global structured (JSON) logging.
///
/// Filter precedence: `SUPEREGO_LOG_LEVEL` env var, then `RUST_LOG`, then
/// `"info"`. Safe to call more than once; later calls are no-ops, matching
/// `tracing::subscriber::set_global_default`'s own idempotence guard.
pub fn init_tracing(target: LogTarget) {
    let filter = std::env::var("SUPEREGO_LOG_LEVEL")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let subscriber = Registry::default().with(filter);

    let result = match target {
        LogTarget::Stdout => {
            tracing::subscriber::set_global_default(subscriber.with(fmt_layer))
        }
        LogTarget::Stderr => {
            tracing::subscriber::set_global_default(subscriber.with(fmt_layer.with_writer(std::io::stderr)))
        }
    };
    if result.is_err() {
        tracing::debug!("global tracing subscriber already set, skipping re-init");
    }
}
