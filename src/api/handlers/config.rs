use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::ApiResponse;
use crate::config::EngineConfig;
use crate::errors::AppError;
use crate::AppState;

pub async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<EngineConfig>> {
    let cfg = state.engine.read().await.clone();
    Json(ApiResponse::ok(cfg))
}

/// Replace the engine config. Missing fields take defaults, unknown fields
/// and invalid values are rejected with 400 and leave the current config in
/// place.
pub async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<EngineConfig>, JsonRejection>,
) -> Result<Json<ApiResponse<EngineConfig>>, AppError> {
    let Json(next) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    next.validate()?;

    *state.engine.write().await = next.clone();
    tracing::info!(config = ?next, "Engine config updated via API");

    Ok(Json(ApiResponse::ok(next)))
}
