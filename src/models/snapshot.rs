use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

/// Market-data provider a snapshot batch was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSource {
    CoinGecko,
    KuCoin,
    Bybit,
}

text_enum!(MarketSource { CoinGecko => "coingecko", KuCoin => "kucoin", Bybit => "bybit" });

/// Uniform per-symbol market view, produced fresh on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: Decimal,
    /// 24h change in percent (e.g. `6.0` = +6%).
    pub change_pct: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    /// 24h quote volume.
    pub volume: Decimal,
    pub source: MarketSource,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} price={} change={}% vol={} ({})",
            self.symbol, self.price, self.change_pct, self.volume, self.source
        )
    }
}
