//! The `superego` binary: a one-shot `advisor` mode for host hook
//! integration, and a `serve` mode exposing the multi-transport gateway.
//!
//! CLI shape uses derive `clap::Parser`/`Subcommand`, one subcommand per
//! mode.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use superego_audit::AuditLog;
use superego_breaker::CircuitBreaker;
use superego_config::Settings;
use superego_hooks::{parse_hook_input, HookOutput};
use superego_inference::{CliProvider, MockProvider, StrategyManager};
use superego_policy::Engine;
use superego_telemetry::{init_tracing, HealthRegistry, LogTarget};
use superego_transport::AppState;

/// Grace window given to in-flight evaluations after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
/// A second signal within this window forces an immediate exit.
const FORCE_EXIT_WINDOW: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "superego", about = "Security interception gateway for AI coding agent tool calls")]
struct Cli {
    /// Path to an optional settings YAML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one hook-shaped JSON object from stdin, evaluate it, and
    /// write one hook output object to stdout. Always exits 0 on a
    /// successful JSON emission, including a `deny`/`block` result; exits
    /// 2 only on a truly fatal internal error.
    Advisor,
    /// Start the stdio/HTTP/WebSocket/SSE gateway and serve until a
    /// shutdown signal is received.
    Serve {
        /// Disable the HTTP/WS/SSE server, running only the stdio
        /// JSON-RPC front end.
        #[arg(long)]
        no_http: bool,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Advisor => run_advisor(cli.config.as_deref()).await,
        Command::Serve { no_http } => run_serve(cli.config.as_deref(), no_http).await,
    }
}

fn build_settings(config: Option<&std::path::Path>) -> Result<Settings, String> {
    let args: Vec<String> = std::env::args().skip(2).collect();
    Settings::load(config, &args).map_err(|e| e.to_string())
}

async fn build_engine(settings: &Settings) -> Arc<Engine> {
    let mut providers = StrategyManager::new();
    providers.register(Arc::new(MockProvider));
    for provider_config in &settings.providers {
        providers.register(Arc::new(CliProvider::new(provider_config.clone())));
    }

    providers.initialize_all().await;

    let breaker = Arc::new(CircuitBreaker::new(settings.breaker));
    let engine = Arc::new(Engine::new(providers, breaker));

    match superego_config::load_once(&settings.rules_path, &engine).await {
        Ok(count) => tracing::info!(rule_count = count, "rules loaded at startup"),
        Err(e) => tracing::warn!(error = %e, "no valid rules file at startup, failing closed"),
    }
    engine
}

async fn run_advisor(config: Option<&std::path::Path>) -> std::process::ExitCode {
    init_tracing(LogTarget::Stderr);

    let settings = match build_settings(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fatal: failed to load configuration: {e}");
            return std::process::ExitCode::from(2);
        }
    };
    let engine = build_engine(&settings).await;

    let mut input = String::new();
    if std::io::Read::read_to_string(&mut std::io::stdin(), &mut input).is_err() {
        eprintln!("fatal: failed to read stdin");
        return std::process::ExitCode::from(2);
    }

    let output = match parse_hook_input(&input) {
        Ok(request) => {
            let decision = engine.evaluate(&request).await;
            HookOutput::from_decision(&decision)
        }
        Err(output) => output,
    };

    match output.to_json() {
        Ok(json) => {
            println!("{json}");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("fatal: failed to serialize hook output: {e}");
            std::process::ExitCode::from(2)
        }
    }
}

async fn run_serve(config: Option<&std::path::Path>, no_http: bool) -> std::process::ExitCode {
    let settings = match build_settings(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fatal: failed to load configuration: {e}");
            return std::process::ExitCode::from(2);
        }
    };
    init_tracing(LogTarget::Stdout);

    let engine = build_engine(&settings).await;
    let audit = Arc::new(AuditLog::new(
        settings.audit_capacity,
        settings.audit_ttl_seconds,
        settings
            .sensitive_key_patterns
            .as_ref()
            .and_then(|patterns| superego_sanitize::Redactor::from_patterns(patterns).ok())
            .unwrap_or_default(),
    ));
    let health = Arc::new(HealthRegistry::new());
    health.report_healthy("policy_engine");
    health.report_healthy("audit_log");

    let shutdown = CancellationToken::new();

    let rules_watcher_result = superego_config::RulesWatcher::start(
        settings.rules_path.clone(),
        engine.clone(),
        {
            let health = health.clone();
            move |result| match result {
                Ok(count) => {
                    tracing::info!(rule_count = count, "rules hot-reloaded");
                    health.report_healthy("config_watcher");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rules reload failed, keeping current snapshot");
                    health.report(superego_core::HealthStatus::new(
                        "config_watcher",
                        superego_core::HealthState::Degraded,
                        e,
                    ));
                }
            }
        },
    );
    let _watcher = match rules_watcher_result {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "failed to start rules file watcher");
            None
        }
    };

    let state = Arc::new(AppState::new(engine, audit, health));

    let mut tasks = Vec::new();

    // §4.I: `purge_expired` is meant to run periodically, not on every
    // append. Once a minute is frequent enough relative to the default
    // 24h TTL without adding meaningful lock contention.
    const AUDIT_PURGE_INTERVAL: Duration = Duration::from_secs(60);
    let purge_shutdown = shutdown.clone();
    let purge_audit = state.audit.clone();
    tasks.push(tokio::spawn(async move {
        let mut interval = tokio::time::interval(AUDIT_PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let purged = purge_audit.purge_expired(chrono::Utc::now());
                    if purged > 0 {
                        tracing::debug!(purged, "evicted expired audit entries");
                    }
                }
                () = purge_shutdown.cancelled() => return,
            }
        }
    }));

    if !no_http {
        let router = superego_transport::router(state.clone());
        let addr = format!("0.0.0.0:{}", settings.http_port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                eprintln!("fatal: failed to bind {addr}: {e}");
                return std::process::ExitCode::from(2);
            }
        };
        tracing::info!(addr = %addr, "http/ws/sse listening");
        let http_shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
                .await;
        }));
    }

    let stdio_shutdown = shutdown.clone();
    let stdio_state = state.clone();
    tasks.push(tokio::spawn(async move {
        superego_transport::stdio::run(
            stdio_state,
            tokio::io::stdin(),
            tokio::io::stdout(),
            stdio_shutdown,
        )
        .await;
    }));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining in-flight work");
    shutdown.cancel();

    let grace = tokio::time::sleep(SHUTDOWN_GRACE);
    tokio::pin!(grace);
    tokio::select! {
        () = futures_join_all(tasks) => {}
        () = &mut grace => {
            tracing::warn!("shutdown grace window elapsed, forcing exit");
        }
    }
    state.engine.cleanup_providers().await;

    std::process::ExitCode::SUCCESS
}

async fn futures_join_all(tasks: Vec<tokio::task::JoinHandle<()>>) {
    for task in tasks {
        let _ = task.await;
    }
}

async fn wait_for_shutdown_signal() {
    let first = tokio::signal::ctrl_c();
    first.await.ok();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("second shutdown signal received, exiting immediately");
            std::process::exit(130);
        }
        () = tokio::time::sleep(FORCE_EXIT_WINDOW) => {}
    }
}
