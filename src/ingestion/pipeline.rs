use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::SharedEngineConfig;
use crate::db::DynStore;
use crate::intelligence::{detect_whales, signal_from_whale, validate_pending, Advance, PriceTracker};
use crate::models::MarketSnapshot;

/// Counts of what one batch produced. Mostly useful for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub whales: usize,
    pub pump_dumps: usize,
    pub signals_created: usize,
    pub signals_staged: usize,
    pub signals_finalized: usize,
    pub signals_expired: usize,
}

/// Detection and validation over snapshot batches.
///
/// Cheap to clone; every clone shares the same price tracker, store and
/// engine config.
#[derive(Clone)]
pub struct Pipeline {
    store: DynStore,
    tracker: PriceTracker,
    engine: SharedEngineConfig,
    /// Serialises the read-advance-write of pending signals across passes.
    validation: Arc<Mutex<()>>,
}

impl Pipeline {
    pub fn new(store: DynStore, tracker: PriceTracker, engine: SharedEngineConfig) -> Self {
        Self {
            store,
            tracker,
            engine,
            validation: Arc::new(Mutex::new(())),
        }
    }

    pub fn tracker(&self) -> &PriceTracker {
        &self.tracker
    }

    pub async fn process_batch(&self, batch: &[MarketSnapshot]) -> anyhow::Result<BatchOutcome> {
        self.process_batch_at(batch, Utc::now()).await
    }

    /// Process one batch:
    /// 1. Detect whale events, persist them and derive one pending signal each
    /// 2. Detect pump/dump moves against the previous prices, persist them
    /// 3. Advance every pending signal using this batch's prices
    ///
    /// A failed write is logged and skipped; the same mutation is retried
    /// safely on a later pass since every write is an upsert.
    pub async fn process_batch_at(
        &self,
        batch: &[MarketSnapshot],
        now: DateTime<Utc>,
    ) -> anyhow::Result<BatchOutcome> {
        let start = Instant::now();
        let cfg = self.engine.read().await.clone();
        let mut outcome = BatchOutcome::default();

        // Step 1: whales -> signals
        for event in detect_whales(batch, cfg.whale_threshold, now) {
            tracing::info!(
                symbol = %event.symbol,
                side = %event.side,
                volume = %event.volume,
                confidence = %event.confidence,
                "Whale activity detected"
            );
            counter!("whale_events_total").increment(1);
            outcome.whales += 1;

            if let Err(e) = self.store.save_whale_event(&event).await {
                tracing::error!(error = %e, symbol = %event.symbol, "Failed to persist whale event");
            }

            let signal = signal_from_whale(&event, now);
            match self.store.save_signal(&signal).await {
                Ok(()) => {
                    counter!("signals_created_total").increment(1);
                    outcome.signals_created += 1;
                    tracing::debug!(
                        signal_id = %signal.id,
                        symbol = %signal.symbol,
                        direction = %signal.direction,
                        "Signal created"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, symbol = %signal.symbol, "Failed to persist signal");
                }
            }
        }

        // Step 2: pump/dump against the previous-price map
        let moves = self.tracker.observe(batch, cfg.pump_threshold, now).await;
        for event in &moves {
            tracing::info!(
                symbol = %event.symbol,
                kind = %event.kind,
                change_pct = %event.change_pct.round_dp(2),
                "Price swing detected"
            );
            counter!("pump_dump_events_total").increment(1);
            if let Err(e) = self.store.save_pump_dump(event).await {
                tracing::error!(error = %e, symbol = %event.symbol, "Failed to persist pump/dump");
            }
        }
        outcome.pump_dumps = moves.len();

        // Step 3: staged validation
        let _validating = self.validation.lock().await;
        let prices: HashMap<String, Decimal> = batch
            .iter()
            .map(|s| (s.symbol.clone(), s.price))
            .collect();
        let pending = self.store.query_pending_signals().await?;

        for (signal, advance) in validate_pending(pending, &prices, &cfg, now) {
            match advance {
                Advance::Staged => outcome.signals_staged += 1,
                Advance::Finalized(status) => {
                    counter!("signals_finalized_total", "status" => status.as_str()).increment(1);
                    outcome.signals_finalized += 1;
                    tracing::info!(
                        signal_id = %signal.id,
                        symbol = %signal.symbol,
                        status = %status,
                        score = signal.score,
                        "Signal validated"
                    );
                }
                Advance::Expired => {
                    counter!("signals_expired_total").increment(1);
                    outcome.signals_expired += 1;
                    tracing::info!(
                        signal_id = %signal.id,
                        symbol = %signal.symbol,
                        "Pending signal expired"
                    );
                }
                Advance::Unchanged => {}
            }

            if let Err(e) = self.store.update_signal(&signal).await {
                tracing::error!(error = %e, signal_id = %signal.id, "Failed to update signal");
            }
        }

        histogram!("pipeline_latency_seconds").record(start.elapsed().as_secs_f64());
        Ok(outcome)
    }
}
