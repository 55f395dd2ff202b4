use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::STAGE_COUNT;

/// Engine config shared between the poller, the trader and the API.
/// Each pass works on a cloned snapshot.
pub type SharedEngineConfig = Arc<RwLock<EngineConfig>>;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: Decimal },

    #[error("validation stage minutes must be strictly increasing and > 0: {0:?}")]
    StageMinutes([u32; STAGE_COUNT]),

    #[error("validation weights sum to {0}, must be at most 100")]
    StageWeights(u32),

    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },

    #[error("pending expiry ({expiry} min) must be later than the last stage ({last_stage} min)")]
    ExpiryTooShort { expiry: u32, last_stage: u32 },
}

/// Detection, validation and risk parameters.
///
/// Closed on purpose: unknown keys in a config payload are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum 24h volume that counts as whale activity.
    pub whale_threshold: Decimal,
    /// Minimum |price move %| since the previous observation for a pump/dump.
    pub pump_threshold: Decimal,
    /// Minutes after signal creation at which each stage fires.
    pub validation_minutes: [u32; STAGE_COUNT],
    /// Score contribution of each passed stage.
    pub validation_weights: [u32; STAGE_COUNT],
    /// Minimum favourable move (%) for a stage to pass.
    pub min_price_change: Decimal,
    /// Signals still pending after this long are closed as invalid.
    pub pending_expiry_minutes: u32,

    pub trade_amount: Decimal,
    pub leverage: u32,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    /// Per-side commission in percent of amount.
    pub commission_pct: Decimal,

    pub max_daily_trades: u32,
    pub max_consecutive_losses: u32,
    pub max_open_positions: u32,
    pub min_score_for_trade: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            whale_threshold: Decimal::from(500_000),
            pump_threshold: Decimal::from(3),
            validation_minutes: [1, 2, 4],
            validation_weights: [20, 30, 50],
            min_price_change: Decimal::new(1, 1), // 0.1%
            pending_expiry_minutes: 30,
            trade_amount: Decimal::from(5),
            leverage: 5,
            stop_loss_pct: Decimal::from(2),
            take_profit_pct: Decimal::from(4),
            commission_pct: Decimal::new(5, 2), // 0.05%
            max_daily_trades: 4,
            max_consecutive_losses: 4,
            max_open_positions: 4,
            min_score_for_trade: 70,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("whale_threshold", self.whale_threshold),
            ("pump_threshold", self.pump_threshold),
            ("trade_amount", self.trade_amount),
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
        ] {
            if value <= Decimal::ZERO {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.min_price_change < Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                field: "min_price_change",
                value: self.min_price_change,
            });
        }
        if self.commission_pct < Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                field: "commission_pct",
                value: self.commission_pct,
            });
        }

        let m = self.validation_minutes;
        if m[0] == 0 || m.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::StageMinutes(m));
        }
        if self.pending_expiry_minutes <= m[STAGE_COUNT - 1] {
            return Err(ConfigError::ExpiryTooShort {
                expiry: self.pending_expiry_minutes,
                last_stage: m[STAGE_COUNT - 1],
            });
        }

        let weight_sum: u32 = self.validation_weights.iter().sum();
        if weight_sum > 100 {
            return Err(ConfigError::StageWeights(weight_sum));
        }

        for (field, value) in [
            ("leverage", self.leverage),
            ("max_daily_trades", self.max_daily_trades),
            ("max_consecutive_losses", self.max_consecutive_losses),
            ("max_open_positions", self.max_open_positions),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }

        Ok(())
    }

    pub fn into_shared(self) -> SharedEngineConfig {
        Arc::new(RwLock::new(self))
    }
}
