use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, SignalStatus, Trend, WhaleFlowTag};

/// Number of timed validation checkpoints every signal goes through.
pub const STAGE_COUNT: usize = 3;

/// Price re-measurement taken at one validation checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCheck {
    pub price: Decimal,
    /// Move since entry, in percent.
    pub change_pct: Decimal,
    pub passed: bool,
    pub checked_at: DateTime<Utc>,
}

/// Directional trade hypothesis derived from a whale event.
///
/// Created `pending` with score 0 and no stages; only the validator mutates it
/// afterwards. Each stage is written at most once and the status leaves
/// `pending` at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub whale_event_id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub volume: Decimal,
    pub trend: Trend,
    pub whale_flow: WhaleFlowTag,
    pub stages: [Option<StageCheck>; STAGE_COUNT],
    pub status: SignalStatus,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl Signal {
    pub fn is_pending(&self) -> bool {
        self.status == SignalStatus::Pending
    }

    /// How many populated stages passed.
    pub fn passed_stages(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.as_ref().is_some_and(|c| c.passed))
            .count()
    }

    /// Whether stage `idx` (0-based) passed. Unpopulated stages count as failed.
    pub fn stage_passed(&self, idx: usize) -> bool {
        self.stages
            .get(idx)
            .and_then(|s| s.as_ref())
            .is_some_and(|c| c.passed)
    }
}
