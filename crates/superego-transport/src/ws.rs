//! WebSocket front end: `{message_id, type, data}` framing dispatched to
//! the same [`AppState`] handlers HTTP uses, with a per-connection
//! keepalive ping task.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Interval between keepalive pings sent to an idle connection.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// One inbound WebSocket frame.
#[derive(Debug, Deserialize)]
struct WsRequest {
    message_id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// One outbound WebSocket frame, echoing the request's `message_id`.
#[derive(Debug, Serialize)]
struct WsResponse {
    message_id: String,
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

/// Mount the `/v1/ws` upgrade route.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/v1/ws", get(handle_upgrade)).with_state(state)
}

async fn handle_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return;
                }
            }
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { return };
                match message {
                    Message::Text(text) => {
                        let response = dispatch(&state, &text).await;
                        if socket.send(Message::Text(response.into())).await.is_err() {
                            return;
                        }
                    }
                    Message::Pong(_) | Message::Ping(_) => {}
                    Message::Close(_) => return,
                    Message::Binary(_) => {}
                }
            }
        }
    }
}

async fn dispatch(state: &Arc<AppState>, text: &str) -> String {
    let request: WsRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            return serde_json::to_string(&WsResponse {
                message_id: String::new(),
                kind: "error".to_string(),
                data: serde_json::json!({"error": format!("invalid frame: {e}")}),
            })
            .unwrap_or_default();
        }
    };

    let data = match request.kind.as_str() {
        "evaluate" => evaluate_frame(state, request.data).await,
        "health" => serde_json::json!({
            "overall": state.health.overall(),
            "per_component": state.health.snapshot(),
        }),
        "ping" => serde_json::json!({"pong": true}),
        "subscribe" => serde_json::json!({"subscribed": true}),
        other => serde_json::json!({"error": format!("unknown message type '{other}'")}),
    };

    serde_json::to_string(&WsResponse { message_id: request.message_id, kind: request.kind, data })
        .unwrap_or_default()
}

async fn evaluate_frame(state: &Arc<AppState>, data: serde_json::Value) -> serde_json::Value {
    let payload: EvaluatePayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(e) => return serde_json::json!({"error": format!("invalid evaluate payload: {e}")}),
    };
    match superego_core::ToolRequest::new(
        &payload.tool_name,
        payload.parameters,
        &payload.cwd,
        &payload.session_id,
        &payload.agent_id,
    ) {
        Ok(tool_request) => {
            let decision = state.evaluate(tool_request).await;
            serde_json::to_value(decision).unwrap_or_default()
        }
        Err(e) => serde_json::json!({"error": e.user_message()}),
    }
}

#[derive(Debug, Deserialize)]
struct EvaluatePayload {
    tool_name: String,
    #[serde(default)]
    parameters: serde_json::Value,
    cwd: String,
    session_id: String,
    agent_id: String,
}
