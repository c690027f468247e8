//! HTTP REST front end: the five gateway endpoints, built on
//! `axum` + `tower-http` — one `Router`, one shared `Arc<AppState>`, a
//! permissive CORS layer, a bounded request body.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use serde::Deserialize;
use superego_core::Decision;
use superego_hooks::{parse_hook_input, HookOutput};

/// Maximum request body size accepted on any POST route: 1 MiB. Requests
/// carry a single tool invocation's parameters, never a bulk payload.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Build the router for the five `/v1/*` endpoints, with CORS and a body
/// size limit layered on as middleware.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/v1/evaluate", post(handle_evaluate))
        .route("/v1/hooks", post(handle_hooks))
        .route("/v1/health", get(handle_health))
        .route("/v1/config/rules", get(handle_config_rules))
        .route("/v1/audit/recent", get(handle_audit_recent))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Wire shape for `POST /v1/evaluate`: the same fields a `ToolRequest` is
/// constructed from, since the typed struct's private fields cannot be
/// deserialized directly.
#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    tool_name: String,
    #[serde(default)]
    parameters: serde_json::Value,
    cwd: String,
    session_id: String,
    agent_id: String,
}

async fn handle_evaluate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let request = match superego_core::ToolRequest::new(
        &body.tool_name,
        body.parameters,
        &body.cwd,
        &body.session_id,
        &body.agent_id,
    ) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };
    let decision: Decision = state.evaluate(request).await;
    (StatusCode::OK, Json(decision)).into_response()
}

async fn handle_hooks(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let request = match parse_hook_input(&body) {
        Ok(r) => r,
        Err(output) => return (StatusCode::OK, Json(output)).into_response(),
    };
    let decision = state.evaluate(request).await;
    (StatusCode::OK, Json(HookOutput::from_decision(&decision))).into_response()
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let overall = state.health.overall();
    let per_component = state.health.snapshot();
    let body = serde_json::json!({
        "overall": overall,
        "per_component": per_component,
    });
    (StatusCode::OK, Json(body))
}

async fn handle_config_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let text = state.rules_text.read().await.clone();
    (StatusCode::OK, [("content-type", "application/yaml")], text)
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

/// Default page size for `GET /v1/audit/recent` when `limit` is omitted.
const DEFAULT_AUDIT_LIMIT: usize = 100;

async fn handle_audit_recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    let entries = state.audit.recent(limit);
    (StatusCode::OK, Json(entries))
}

fn error_response(e: &superego_core::Error) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e.user_message()}))).into_response()
}
