//! `GET /ping`: liveness probe.

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn ping(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "Healthy",
        "time_of_last_update": state.health.last_update(),
    }))
}
