use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::ApiResponse;
use crate::errors::AppError;
use crate::execution::TraderStats;
use crate::AppState;

/// POST /api/auto-trade/start
pub async fn start(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>, AppError> {
    let started = state.trader.start().await?;
    Ok(Json(ApiResponse::ok(json!({
        "running": true,
        "already_running": !started,
    }))))
}

/// POST /api/auto-trade/stop
pub async fn stop(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let was_running = state.trader.stop().await;
    Json(ApiResponse::ok(json!({
        "running": false,
        "was_running": was_running,
    })))
}

/// GET /api/auto-trade/stats
pub async fn stats(State(state): State<AppState>) -> Json<ApiResponse<TraderStats>> {
    Json(ApiResponse::ok(state.trader.stats().await))
}
