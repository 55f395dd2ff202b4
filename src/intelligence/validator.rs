use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::config::EngineConfig;
use crate::models::{Direction, Signal, SignalStatus, StageCheck, STAGE_COUNT};

use super::scorer::score_signal;

/// Minimum passed stages for a signal to end up valid.
const MIN_PASSED_STAGES: usize = 2;

/// What a validation pass did to one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Nothing was due or no price was available.
    Unchanged,
    /// One or more stages were recorded, still pending.
    Staged,
    /// The last stage fired and the signal reached a terminal status.
    Finalized(SignalStatus),
    /// Pending for longer than the expiry window; closed as invalid.
    Expired,
}

impl Advance {
    pub fn mutated(&self) -> bool {
        !matches!(self, Advance::Unchanged)
    }
}

/// Move since entry in percent. Zero when the entry price is unusable.
pub fn price_change_pct(entry: Decimal, current: Decimal) -> Decimal {
    if entry.is_zero() {
        return Decimal::ZERO;
    }
    (current - entry) / entry * Decimal::ONE_HUNDRED
}

/// Whether a move of `change_pct` confirms `direction`.
pub fn stage_passes(direction: Direction, change_pct: Decimal, min_change: Decimal) -> bool {
    match direction {
        Direction::Long => change_pct >= min_change,
        Direction::Short => change_pct <= -min_change,
    }
}

/// Advance one signal through its timed stages.
///
/// Stages already populated are never touched again, and only a signal that
/// is still pending is considered. `price` is the symbol's price in the
/// current batch; without one no stage can fire.
pub fn advance_signal(
    signal: &mut Signal,
    price: Option<Decimal>,
    cfg: &EngineConfig,
    now: DateTime<Utc>,
) -> Advance {
    if !signal.is_pending() {
        return Advance::Unchanged;
    }

    let elapsed = now - signal.created_at;
    if elapsed >= Duration::minutes(i64::from(cfg.pending_expiry_minutes)) {
        signal.status = SignalStatus::Invalid;
        signal.score = 0;
        signal.validated_at = Some(now);
        return Advance::Expired;
    }

    let Some(price) = price else {
        return Advance::Unchanged;
    };

    let change_pct = price_change_pct(signal.entry_price, price);
    let passed = stage_passes(signal.direction, change_pct, cfg.min_price_change);

    let mut staged = false;
    for (slot, minutes) in signal.stages.iter_mut().zip(cfg.validation_minutes) {
        if slot.is_some() || elapsed < Duration::minutes(i64::from(minutes)) {
            continue;
        }
        *slot = Some(StageCheck {
            price,
            change_pct,
            passed,
            checked_at: now,
        });
        staged = true;
    }

    if !staged {
        return Advance::Unchanged;
    }

    if signal.stages[STAGE_COUNT - 1].is_none() {
        return Advance::Staged;
    }

    signal.status = if signal.passed_stages() >= MIN_PASSED_STAGES {
        SignalStatus::Valid
    } else {
        SignalStatus::Invalid
    };
    signal.score = score_signal(signal, &cfg.validation_weights);
    signal.validated_at = Some(now);
    Advance::Finalized(signal.status)
}

/// Run every pending signal against the latest batch prices. Returns the
/// signals that changed together with what happened to each.
pub fn validate_pending(
    pending: Vec<Signal>,
    prices: &HashMap<String, Decimal>,
    cfg: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<(Signal, Advance)> {
    pending
        .into_iter()
        .filter_map(|mut signal| {
            let price = prices.get(&signal.symbol).copied();
            let outcome = advance_signal(&mut signal, price, cfg, now);
            outcome.mutated().then_some((signal, outcome))
        })
        .collect()
}
