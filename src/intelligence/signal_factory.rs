use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Direction, Signal, SignalStatus, Trend, WhaleEvent, WhaleFlowTag, WhaleSide};

/// |24h change| above which the move counts as a trend.
const TREND_CHANGE_PCT: i64 = 2;

/// Derive the pending signal a whale event implies.
pub fn signal_from_whale(event: &WhaleEvent, now: DateTime<Utc>) -> Signal {
    let direction = match event.side {
        WhaleSide::Buy => Direction::Long,
        WhaleSide::Sell => Direction::Short,
    };
    let (trend, whale_flow) = classify_move(event.change_pct);

    Signal {
        id: Uuid::new_v4(),
        whale_event_id: event.id,
        symbol: event.symbol.clone(),
        direction,
        entry_price: event.price,
        volume: event.volume,
        trend,
        whale_flow,
        stages: [None, None, None],
        status: SignalStatus::Pending,
        score: 0,
        created_at: now,
        validated_at: None,
    }
}

/// Trend and whale-flow tags both follow the 24h change.
pub fn classify_move(change_pct: Decimal) -> (Trend, WhaleFlowTag) {
    let bound = Decimal::from(TREND_CHANGE_PCT);
    if change_pct > bound {
        (Trend::Bullish, WhaleFlowTag::Inflow)
    } else if change_pct < -bound {
        (Trend::Bearish, WhaleFlowTag::Outflow)
    } else {
        (Trend::Neutral, WhaleFlowTag::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whale(side: WhaleSide, change: i64) -> WhaleEvent {
        WhaleEvent {
            id: Uuid::new_v4(),
            symbol: "SOLUSDT".into(),
            price: Decimal::from(150),
            volume: Decimal::from(2_000_000),
            change_pct: Decimal::from(change),
            side,
            confidence: Decimal::from(70),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_buy_whale_gives_pending_long() {
        let event = whale(WhaleSide::Buy, 5);
        let signal = signal_from_whale(&event, Utc::now());
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.trend, Trend::Bullish);
        assert_eq!(signal.whale_flow, WhaleFlowTag::Inflow);
        assert_eq!(signal.entry_price, event.price);
        assert_eq!(signal.whale_event_id, event.id);
        assert!(signal.is_pending());
        assert_eq!(signal.score, 0);
        assert!(signal.stages.iter().all(Option::is_none));
    }

    #[test]
    fn test_trend_bounds_are_exclusive() {
        assert_eq!(classify_move(Decimal::from(2)).0, Trend::Neutral);
        assert_eq!(classify_move(Decimal::from(-2)).1, WhaleFlowTag::Neutral);
        assert_eq!(classify_move(Decimal::new(-201, 2)).0, Trend::Bearish);
    }
}
