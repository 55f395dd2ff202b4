use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::ApiResponse;
use crate::errors::AppError;
use crate::ingestion::BatchOutcome;
use crate::models::{MarketSnapshot, MarketSource};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarketBatch {
    pub source: MarketSource,
    pub snapshots: Vec<MarketSnapshot>,
    pub outcome: BatchOutcome,
}

/// GET /api/market?source=: fetch one batch on demand and run it through
/// the same pipeline as the scheduled poller.
pub async fn fetch(
    State(state): State<AppState>,
    Query(q): Query<MarketQuery>,
) -> Result<Json<ApiResponse<MarketBatch>>, AppError> {
    let source = match q.source.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw.to_lowercase().parse::<MarketSource>()?,
        None => state.config.market_source,
    };

    let snapshots = state.market_client.fetch_snapshots(source).await?;
    let outcome = state.pipeline.process_batch(&snapshots).await?;

    Ok(Json(ApiResponse::ok(MarketBatch {
        source,
        snapshots,
        outcome,
    })))
}
