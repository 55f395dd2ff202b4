use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{clamp_limit, ApiResponse};
use crate::errors::AppError;
use crate::models::{Trade, TradeStats, TradeStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TradeQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TradeList {
    pub trades: Vec<Trade>,
    pub daily: TradeStats,
    pub monthly: TradeStats,
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .unwrap_or(now.date_naive())
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// GET /api/trades?status=&limit=
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<TradeQuery>,
) -> Result<Json<ApiResponse<TradeList>>, AppError> {
    let status = q
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<TradeStatus>)
        .transpose()?;

    let now = Utc::now();
    let trades = state.store.query_trades(status, clamp_limit(q.limit)).await?;
    let daily = state.store.trade_stats(start_of_day(now)).await?;
    let monthly = state.store.trade_stats(start_of_month(now)).await?;

    Ok(Json(ApiResponse::ok(TradeList {
        trades,
        daily,
        monthly,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn period_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 5, 17, 13, 45, 0).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2026, 5, 17, 0, 0, 0).unwrap());
        assert_eq!(start_of_month(now), Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
    }
}
