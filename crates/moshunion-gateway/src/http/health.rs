use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::{atomic::Ordering, Arc};

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("MOSHUNION_GIT_SHA"),
        "protocol": moshunion_core::config::PROTOCOL_VERSION,
        "ws_clients": state.ws_clients.load(Ordering::Relaxed),
        "tours": state.store.len(),
        "rooms": state.hub.room_count(),
    }))
}
