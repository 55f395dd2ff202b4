use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{clamp_limit, ApiResponse};
use crate::errors::AppError;
use crate::models::{PumpDumpEvent, WhaleEvent, WhaleFlow};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WhaleActivity {
    pub events: Vec<WhaleEvent>,
    /// Buy vs sell whale volume over the last 24h.
    pub flow_24h: WhaleFlow,
}

pub async fn whales(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<ApiResponse<WhaleActivity>>, AppError> {
    let events = state.store.query_whale_events(clamp_limit(q.limit)).await?;
    let flow_24h = state.store.whale_flow(Utc::now() - Duration::hours(24)).await?;
    Ok(Json(ApiResponse::ok(WhaleActivity { events, flow_24h })))
}

pub async fn pump_dumps(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<PumpDumpEvent>>>, AppError> {
    let events = state.store.query_pump_dumps(clamp_limit(q.limit)).await?;
    Ok(Json(ApiResponse::ok(events)))
}
