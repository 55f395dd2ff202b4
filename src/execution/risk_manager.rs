use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::models::{CloseReason, Direction, Trade, TradeClose};

/// Why the trader is not opening anything right now.
///
/// Not an error in the failure sense: a breach pauses or stops trading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskViolation {
    #[error("daily trade limit reached: {current}/{max}")]
    DailyLimitReached { current: u32, max: u32 },

    #[error("consecutive losses limit reached: {current}/{max}")]
    ConsecutiveLosses { current: u32, max: u32 },

    #[error("too many open positions: {current}/{max}")]
    TooManyPositions { current: usize, max: u32 },
}

impl RiskViolation {
    /// Breaches that switch the trader off rather than just pausing it.
    pub fn stops_trading(&self) -> bool {
        matches!(self, RiskViolation::ConsecutiveLosses { .. })
    }
}

/// Counters the gate decides on, plus running totals for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraderCounters {
    pub trading_day: NaiveDate,
    pub daily_trades: u32,
    pub consecutive_losses: u32,
    pub total_trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_pnl: Decimal,
    pub total_commission: Decimal,
}

impl TraderCounters {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            trading_day: today,
            daily_trades: 0,
            consecutive_losses: 0,
            total_trades: 0,
            wins: 0,
            losses: 0,
            total_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
        }
    }

    /// Reset the daily counter when the calendar day changes.
    pub fn roll_date(&mut self, today: NaiveDate) {
        if today != self.trading_day {
            self.trading_day = today;
            self.daily_trades = 0;
        }
    }

    pub fn record_open(&mut self) {
        self.daily_trades += 1;
        self.total_trades += 1;
    }

    pub fn record_close(&mut self, close: &TradeClose) {
        self.total_pnl += close.pnl;
        self.total_commission += close.commission;
        if close.net_pnl < Decimal::ZERO {
            self.consecutive_losses += 1;
            self.losses += 1;
        } else {
            self.consecutive_losses = 0;
            self.wins += 1;
        }
    }
}

/// Run the gate checks in order: date rollover, daily limit, loss streak,
/// open-position cap. Returns Ok(()) if a new trade may be opened.
pub fn check_gate(
    counters: &mut TraderCounters,
    open_positions: usize,
    today: NaiveDate,
    cfg: &EngineConfig,
) -> Result<(), RiskViolation> {
    counters.roll_date(today);

    if counters.daily_trades >= cfg.max_daily_trades {
        return Err(RiskViolation::DailyLimitReached {
            current: counters.daily_trades,
            max: cfg.max_daily_trades,
        });
    }

    if counters.consecutive_losses >= cfg.max_consecutive_losses {
        return Err(RiskViolation::ConsecutiveLosses {
            current: counters.consecutive_losses,
            max: cfg.max_consecutive_losses,
        });
    }

    if open_positions >= cfg.max_open_positions as usize {
        return Err(RiskViolation::TooManyPositions {
            current: open_positions,
            max: cfg.max_open_positions,
        });
    }

    Ok(())
}

/// Stop-loss and take-profit prices for a new position.
/// LONG: SL below, TP above entry. SHORT: mirrored.
pub fn stop_and_target(
    direction: Direction,
    entry: Decimal,
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
) -> (Decimal, Decimal) {
    let sl = stop_loss_pct / Decimal::ONE_HUNDRED;
    let tp = take_profit_pct / Decimal::ONE_HUNDRED;
    match direction {
        Direction::Long => (entry * (Decimal::ONE - sl), entry * (Decimal::ONE + tp)),
        Direction::Short => (entry * (Decimal::ONE + sl), entry * (Decimal::ONE - tp)),
    }
}

/// Whether `price` crosses the trade's stop or target. Stop-loss wins when
/// both would match.
pub fn check_exit(trade: &Trade, price: Decimal) -> Option<CloseReason> {
    match trade.side {
        Direction::Long if price <= trade.stop_loss => Some(CloseReason::StopLoss),
        Direction::Long if price >= trade.take_profit => Some(CloseReason::TakeProfit),
        Direction::Short if price >= trade.stop_loss => Some(CloseReason::StopLoss),
        Direction::Short if price <= trade.take_profit => Some(CloseReason::TakeProfit),
        _ => None,
    }
}

/// Realised outcome of closing `trade` at `exit_price`.
///
/// pnl = move / entry * amount * leverage, signed by direction.
/// Commission is charged on both sides of the round trip.
pub fn close_outcome(
    trade: &Trade,
    exit_price: Decimal,
    reason: CloseReason,
    commission_pct: Decimal,
    closed_at: DateTime<Utc>,
) -> TradeClose {
    let raw_move = if trade.entry_price.is_zero() {
        Decimal::ZERO
    } else {
        (exit_price - trade.entry_price) / trade.entry_price
    };

    let pnl = raw_move * trade.amount * Decimal::from(trade.leverage) * trade.side.sign();
    let commission = trade.amount * commission_pct / Decimal::ONE_HUNDRED * Decimal::TWO;

    TradeClose {
        exit_price,
        reason,
        pnl,
        pnl_percent: raw_move * Decimal::ONE_HUNDRED,
        commission,
        net_pnl: pnl - commission,
        closed_at,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
