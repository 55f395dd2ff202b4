use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{MarketSnapshot, PumpDumpEvent, PumpDumpKind, WhaleEvent, WhaleSide};

// ---------------------------------------------------------------------------
// Whale detection
// ---------------------------------------------------------------------------

/// Emit one whale event for every snapshot whose 24h volume reaches the
/// threshold. Direction follows the sign of the 24h change.
pub fn detect_whales(
    batch: &[MarketSnapshot],
    threshold: Decimal,
    now: DateTime<Utc>,
) -> Vec<WhaleEvent> {
    batch
        .iter()
        .filter(|s| s.volume >= threshold)
        .map(|s| WhaleEvent {
            id: Uuid::new_v4(),
            symbol: s.symbol.clone(),
            price: s.price,
            volume: s.volume,
            change_pct: s.change_pct,
            side: if s.change_pct < Decimal::ZERO {
                WhaleSide::Sell
            } else {
                WhaleSide::Buy
            },
            confidence: whale_confidence(s),
            detected_at: now,
        })
        .collect()
}

/// Heuristic weighting of a whale snapshot in [0, 100]. Not a probability.
///
/// Base 50, then volume tier (+20 / +10), move size (+15 / +10) and +15 when
/// the price sits within 2% of the 24h high or low.
pub fn whale_confidence(s: &MarketSnapshot) -> Decimal {
    let mut score = Decimal::from(50);

    if s.volume >= Decimal::from(1_000_000) {
        score += Decimal::from(20);
    } else if s.volume >= Decimal::from(500_000) {
        score += Decimal::from(10);
    }

    let move_size = s.change_pct.abs();
    if move_size >= Decimal::from(5) {
        score += Decimal::from(15);
    } else if move_size >= Decimal::from(3) {
        score += Decimal::from(10);
    }

    let near_high = s.price >= s.high * Decimal::new(98, 2);
    let near_low = s.price <= s.low * Decimal::new(102, 2);
    if near_high || near_low {
        score += Decimal::from(15);
    }

    score.min(Decimal::ONE_HUNDRED)
}

// ---------------------------------------------------------------------------
// Pump/dump detection
// ---------------------------------------------------------------------------

/// Last observed price per symbol.
///
/// One lock covers the whole read-compare-update pass over a batch, so two
/// concurrent passes never compare against a half-updated map.
#[derive(Debug, Clone, Default)]
pub struct PriceTracker {
    prices: Arc<Mutex<HashMap<String, Decimal>>>,
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare every snapshot against its previous price and record the new
    /// one. The map is updated for every symbol even when nothing fires; a
    /// symbol seen for the first time never produces an event.
    pub async fn observe(
        &self,
        batch: &[MarketSnapshot],
        threshold: Decimal,
        now: DateTime<Utc>,
    ) -> Vec<PumpDumpEvent> {
        let mut prices = self.prices.lock().await;
        let mut events = Vec::new();

        for s in batch {
            let prev = prices.insert(s.symbol.clone(), s.price);
            let Some(prev) = prev.filter(|p| !p.is_zero()) else {
                continue;
            };

            let change_pct = (s.price - prev) / prev * Decimal::ONE_HUNDRED;
            if change_pct.abs() < threshold {
                continue;
            }

            events.push(PumpDumpEvent {
                id: Uuid::new_v4(),
                symbol: s.symbol.clone(),
                price: s.price,
                prev_price: prev,
                change_pct,
                kind: if change_pct > Decimal::ZERO {
                    PumpDumpKind::Pump
                } else {
                    PumpDumpKind::Dump
                },
                volume: s.volume,
                detected_at: now,
            });
        }

        events
    }

    pub async fn latest(&self, symbol: &str) -> Option<Decimal> {
        self.prices.lock().await.get(symbol).copied()
    }

    /// Copy of the whole map, for inspection.
    pub async fn snapshot(&self) -> HashMap<String, Decimal> {
        self.prices.lock().await.clone()
    }
}
