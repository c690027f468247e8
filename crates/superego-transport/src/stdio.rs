//! Stdio JSON-RPC front end: line-delimited requests on stdin, one
//! evaluation in flight at a time, responses written to stdout in the
//! order requests arrived. All logging in this mode is configured to
//! stderr (`superego_telemetry::LogTarget::Stderr`) so stdout carries the
//! wire protocol only.
//!
//! Runs on a dedicated task so it can be explicitly cancelled on shutdown
//! rather than left as an unshut blocking worker (§5's "ensure every
//! spawned executor/worker is terminated in the shutdown path").

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    id: serde_json::Value,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvaluateParams {
    tool_name: String,
    #[serde(default)]
    parameters: serde_json::Value,
    cwd: String,
    session_id: String,
    agent_id: String,
}

/// Run the stdio JSON-RPC loop against `stdin`/`stdout` until EOF or
/// `shutdown` is cancelled. Every request is fully handled (including its
/// async evaluation) before the next line is read, so responses are
/// written strictly FIFO.
pub async fn run(
    state: Arc<AppState>,
    stdin: impl tokio::io::AsyncRead + Unpin,
    mut stdout: impl tokio::io::AsyncWrite + Unpin,
    shutdown: CancellationToken,
) {
    let mut lines = BufReader::new(stdin).lines();

    loop {
        let next_line = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match next_line {
            Ok(Some(line)) if !line.trim().is_empty() => line,
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdio read failed");
                break;
            }
        };

        let response = handle_line(&state, &line).await;
        let Ok(mut serialized) = serde_json::to_string(&response) else { continue };
        serialized.push('\n');
        if stdout.write_all(serialized.as_bytes()).await.is_err() {
            break;
        }
        if stdout.flush().await.is_err() {
            break;
        }
    }
}

async fn handle_line(state: &Arc<AppState>, line: &str) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return RpcResponse {
                id: serde_json::Value::Null,
                result: None,
                error: Some(format!("malformed JSON-RPC request: {e}")),
            }
        }
    };

    let result = match request.method.as_str() {
        "evaluate" => evaluate(state, request.params).await,
        "health" => Ok(serde_json::json!({
            "overall": state.health.overall(),
            "per_component": state.health.snapshot(),
        })),
        other => Err(format!("unknown method '{other}'")),
    };

    match result {
        Ok(value) => RpcResponse { id: request.id, result: Some(value), error: None },
        Err(message) => RpcResponse { id: request.id, result: None, error: Some(message) },
    }
}

async fn evaluate(state: &Arc<AppState>, params: serde_json::Value) -> Result<serde_json::Value, String> {
    let params: EvaluateParams =
        serde_json::from_value(params).map_err(|e| format!("invalid evaluate params: {e}"))?;
    let request = superego_core::ToolRequest::new(
        &params.tool_name,
        params.parameters,
        &params.cwd,
        &params.session_id,
        &params.agent_id,
    )
    .map_err(|e| e.user_message().to_string())?;
    let decision = state.evaluate(request).await;
    serde_json::to_value(decision).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use superego_breaker::{BreakerConfig, CircuitBreaker};
    use superego_inference::StrategyManager;
    use superego_policy::Engine;

    fn test_state() -> Arc<AppState> {
        let engine = Arc::new(Engine::new(
            StrategyManager::new(),
            Arc::new(CircuitBreaker::new(BreakerConfig::default())),
        ));
        engine.swap_rules(superego_core::RuleSet::new(vec![]));
        Arc::new(AppState::new(
            engine,
            Arc::new(superego_audit::AuditLog::default()),
            Arc::new(superego_telemetry::HealthRegistry::new()),
        ))
    }

    #[tokio::test]
    async fn evaluate_request_yields_deny_with_no_rules() {
        let state = test_state();
        let input = br#"{"id":1,"method":"evaluate","params":{"tool_name":"ls","parameters":{},"cwd":"/tmp","session_id":"s","agent_id":"a"}}
"#;
        let mut output = Vec::new();
        let shutdown = CancellationToken::new();
        run(state, &input[..], &mut output, shutdown).await;
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\"deny\""));
    }

    #[tokio::test]
    async fn malformed_line_yields_error_response() {
        let state = test_state();
        let input = b"not json\n";
        let mut output = Vec::new();
        let shutdown = CancellationToken::new();
        run(state, &input[..], &mut output, shutdown).await;
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("error"));
    }
}
