use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{PumpDumpKind, WhaleSide};

/// Large-volume activity on a symbol. Immutable once detected; drives
/// exactly one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleEvent {
    pub id: Uuid,
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub change_pct: Decimal,
    pub side: WhaleSide,
    /// Heuristic weighting in [0, 100]. Not a probability.
    pub confidence: Decimal,
    pub detected_at: DateTime<Utc>,
}

impl fmt::Display for WhaleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Whale: {} side={} price={} volume={} change={}% confidence={}",
            self.symbol, self.side, self.price, self.volume, self.change_pct, self.confidence,
        )
    }
}

/// Short-horizon price swing relative to the last observed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpDumpEvent {
    pub id: Uuid,
    pub symbol: String,
    pub price: Decimal,
    pub prev_price: Decimal,
    pub change_pct: Decimal,
    pub kind: PumpDumpKind,
    pub volume: Decimal,
    pub detected_at: DateTime<Utc>,
}

impl fmt::Display for PumpDumpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} -> {} ({}%)",
            self.kind, self.symbol, self.prev_price, self.price, self.change_pct,
        )
    }
}
