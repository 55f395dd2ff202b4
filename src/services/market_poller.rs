use metrics::counter;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::ingestion::{BatchOutcome, MarketDataClient, Pipeline};
use crate::models::MarketSource;

/// Fetch one batch and push it through detection and validation.
///
/// Any fetch error skips the cycle without touching state.
pub async fn poll_once(
    client: &MarketDataClient,
    pipeline: &Pipeline,
    source: MarketSource,
) -> Option<BatchOutcome> {
    let batch = match client.fetch_snapshots(source).await {
        Ok(b) => b,
        Err(e) => {
            counter!("market_fetch_failures_total").increment(1);
            tracing::warn!(error = %e, source = %source, "Market fetch failed, skipping cycle");
            return None;
        }
    };

    match pipeline.process_batch(&batch).await {
        Ok(outcome) => {
            tracing::debug!(
                source = %source,
                snapshots = batch.len(),
                whales = outcome.whales,
                pump_dumps = outcome.pump_dumps,
                finalized = outcome.signals_finalized,
                expired = outcome.signals_expired,
                "Market batch processed"
            );
            Some(outcome)
        }
        Err(e) => {
            tracing::error!(error = %e, source = %source, "Market batch processing failed");
            None
        }
    }
}

/// Run detection and validation on a fixed schedule, independent of API
/// traffic.
pub async fn run_market_poller(
    client: MarketDataClient,
    pipeline: Pipeline,
    source: MarketSource,
    interval_secs: u64,
) {
    tracing::info!(source = %source, interval_secs, "Market poller started");

    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        poll_once(&client, &pipeline, source).await;
    }
}
