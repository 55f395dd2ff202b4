use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome counts across all signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalStats {
    pub valid: i64,
    pub invalid: i64,
    pub pending: i64,
    /// valid / (valid + invalid) * 100, or 0 with no finished signals.
    pub accuracy: Decimal,
}

impl SignalStats {
    pub fn from_counts(valid: i64, invalid: i64, pending: i64) -> Self {
        let finished = valid + invalid;
        let accuracy = if finished > 0 {
            Decimal::from(valid) / Decimal::from(finished) * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        Self {
            valid,
            invalid,
            pending,
            accuracy,
        }
    }
}

/// Aggregate over closed trades in a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub total_commission: Decimal,
}

impl TradeStats {
    /// Fold closed-trade `(net_pnl, commission)` pairs into stats.
    pub fn from_closed<I>(closed: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let mut stats = TradeStats::default();
        for (net_pnl, commission) in closed {
            stats.total_trades += 1;
            if net_pnl > Decimal::ZERO {
                stats.wins += 1;
            } else if net_pnl < Decimal::ZERO {
                stats.losses += 1;
            }
            stats.total_pnl += net_pnl;
            stats.total_commission += commission;
        }
        if stats.total_trades > 0 {
            stats.win_rate = Decimal::from(stats.wins) / Decimal::from(stats.total_trades)
                * Decimal::ONE_HUNDRED;
        }
        stats
    }
}

/// Whale volume split by side over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WhaleFlow {
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub net: Decimal,
}

impl WhaleFlow {
    pub fn new(inflow: Decimal, outflow: Decimal) -> Self {
        Self {
            inflow,
            outflow,
            net: inflow - outflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_accuracy() {
        let stats = SignalStats::from_counts(3, 1, 7);
        assert_eq!(stats.accuracy, Decimal::from(75));

        let empty = SignalStats::from_counts(0, 0, 2);
        assert_eq!(empty.accuracy, Decimal::ZERO);
    }

    #[test]
    fn test_trade_stats_counts_break_even_as_neither() {
        let stats = TradeStats::from_closed(vec![
            (Decimal::from(2), Decimal::new(5, 3)),
            (Decimal::from(-1), Decimal::new(5, 3)),
            (Decimal::ZERO, Decimal::new(5, 3)),
            (Decimal::from(3), Decimal::new(5, 3)),
        ]);
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.win_rate, Decimal::from(50));
        assert_eq!(stats.total_pnl, Decimal::from(4));
        assert_eq!(stats.total_commission, Decimal::new(20, 3));
    }
}
