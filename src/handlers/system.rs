use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// Public view of the maintenance flag so clients can show a banner
pub async fn maintenance_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.maintenance.status().await;

    Json(json!({
        "success": true,
        "maintenance": status.enabled,
        "message": status.message,
    }))
}
