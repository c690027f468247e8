//! Multi-transport serving: stdio JSON-RPC, HTTP REST, WebSocket, and SSE
//! front ends sharing one [`state::AppState`] evaluation entrypoint.

pub mod http;
pub mod sse;
pub mod state;
pub mod stdio;
pub mod ws;

pub use state::{AppState, GatewayEvent};

use std::sync::Arc;

/// Build the combined HTTP + WebSocket + SSE router, merging each
/// sub-router's routes onto one `Arc<AppState>`.
#[must_use]
pub fn router(state: Arc<AppState>) -> axum::Router {
    http::router(state.clone()).merge(ws::router(state.clone())).merge(sse::router(state))
}
