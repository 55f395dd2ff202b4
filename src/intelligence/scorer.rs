use crate::models::{Direction, Signal, Trend, WhaleFlowTag, STAGE_COUNT};

/// Bonus for each piece of context that agrees with the signal direction.
const ALIGNMENT_BONUS: i32 = 10;

const MAX_SCORE: i32 = 100;

/// Weighted sum of passed stages plus alignment bonuses, capped at 100.
///
/// Only meaningful once the last stage has fired; the validator is the only
/// caller and only calls it at that point.
pub fn score_signal(signal: &Signal, weights: &[u32; STAGE_COUNT]) -> i32 {
    let stages: i64 = weights
        .iter()
        .enumerate()
        .filter(|(idx, _)| signal.stage_passed(*idx))
        .map(|(_, w)| i64::from(*w))
        .sum();

    let mut score = i32::try_from(stages).unwrap_or(MAX_SCORE);
    if trend_aligned(signal.direction, signal.trend) {
        score += ALIGNMENT_BONUS;
    }
    if flow_aligned(signal.direction, signal.whale_flow) {
        score += ALIGNMENT_BONUS;
    }

    score.clamp(0, MAX_SCORE)
}

fn trend_aligned(direction: Direction, trend: Trend) -> bool {
    matches!(
        (direction, trend),
        (Direction::Long, Trend::Bullish) | (Direction::Short, Trend::Bearish)
    )
}

fn flow_aligned(direction: Direction, flow: WhaleFlowTag) -> bool {
    matches!(
        (direction, flow),
        (Direction::Long, WhaleFlowTag::Inflow) | (Direction::Short, WhaleFlowTag::Outflow)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignalStatus, StageCheck};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn signal(direction: Direction, trend: Trend, flow: WhaleFlowTag, passed: [bool; 3]) -> Signal {
        let stages = passed.map(|p| {
            Some(StageCheck {
                price: Decimal::from(100),
                change_pct: Decimal::ZERO,
                passed: p,
                checked_at: Utc::now(),
            })
        });
        Signal {
            id: Uuid::new_v4(),
            whale_event_id: Uuid::new_v4(),
            symbol: "BTCUSDT".into(),
            direction,
            entry_price: Decimal::from(100),
            volume: Decimal::from(600_000),
            trend,
            whale_flow: flow,
            stages,
            status: SignalStatus::Pending,
            score: 0,
            created_at: Utc::now(),
            validated_at: None,
        }
    }

    #[test]
    fn test_weights_plus_both_bonuses() {
        let s = signal(Direction::Long, Trend::Bullish, WhaleFlowTag::Inflow, [true, false, true]);
        assert_eq!(score_signal(&s, &[20, 30, 50]), 90);
    }

    #[test]
    fn test_misaligned_context_gets_no_bonus() {
        let s = signal(Direction::Short, Trend::Bullish, WhaleFlowTag::Neutral, [true, true, false]);
        assert_eq!(score_signal(&s, &[20, 30, 50]), 50);
    }

    #[test]
    fn test_score_capped_at_100() {
        let s = signal(Direction::Short, Trend::Bearish, WhaleFlowTag::Outflow, [true, true, true]);
        assert_eq!(score_signal(&s, &[20, 30, 50]), 100);
    }
}
