use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{clamp_limit, ApiResponse};
use crate::errors::AppError;
use crate::models::{Signal, SignalStats, SignalStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SignalList {
    pub signals: Vec<Signal>,
    pub stats: SignalStats,
}

/// GET /api/signals?status=&limit=
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<SignalQuery>,
) -> Result<Json<ApiResponse<SignalList>>, AppError> {
    let status = q
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<SignalStatus>)
        .transpose()?;

    let signals = state.store.query_signals(status, clamp_limit(q.limit)).await?;
    let stats = state.store.signal_stats().await?;

    Ok(Json(ApiResponse::ok(SignalList { signals, stats })))
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub limit: Option<usize>,
}

/// GET /api/trade-queue: valid signals the trader would pick next.
pub async fn trade_queue(
    State(state): State<AppState>,
    Query(q): Query<QueueQuery>,
) -> Result<Json<ApiResponse<Vec<Signal>>>, AppError> {
    let queue = state.trader.trade_queue(q.limit.unwrap_or(10).min(50)).await?;
    Ok(Json(ApiResponse::ok(queue)))
}
