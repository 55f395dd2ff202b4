use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CloseReason, Direction, OrderStatus, TradeStatus};

/// A simulated (or exchange-backed) position opened from a valid signal.
///
/// `stop_loss` and `take_profit` are fixed when the trade is opened.
/// `status` moves `open -> closed` exactly once, at which point `close` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub symbol: String,
    pub side: Direction,
    pub entry_price: Decimal,
    /// Margin committed, in quote currency.
    pub amount: Decimal,
    pub leverage: i32,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub exchange: String,
    pub status: TradeStatus,
    pub order_status: OrderStatus,
    pub order_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub close: Option<TradeClose>,
}

/// Realised outcome recorded when a trade closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeClose {
    pub exit_price: Decimal,
    pub reason: CloseReason,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
    pub commission: Decimal,
    pub net_pnl: Decimal,
    pub closed_at: DateTime<Utc>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn net_pnl(&self) -> Option<Decimal> {
        self.close.as_ref().map(|c| c.net_pnl)
    }
}
