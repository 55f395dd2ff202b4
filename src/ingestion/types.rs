use rust_decimal::Decimal;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// CoinGecko: /coins/markets (numeric JSON fields, nullable)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoMarket {
    pub symbol: String,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    #[serde(default)]
    pub high_24h: Option<Decimal>,
    #[serde(default)]
    pub low_24h: Option<Decimal>,
    #[serde(default)]
    pub total_volume: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// KuCoin: /api/v1/market/allTickers (string fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct KuCoinResponse {
    pub data: KuCoinData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KuCoinData {
    #[serde(default)]
    pub ticker: Vec<KuCoinTicker>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KuCoinTicker {
    pub symbol: String,
    pub last: Option<String>,
    /// Fractional, 0.05 = +5%.
    pub change_rate: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub vol_value: Option<String>,
}

// ---------------------------------------------------------------------------
// Bybit: /v5/market/tickers?category=spot (string fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BybitResponse {
    pub result: BybitResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BybitResult {
    #[serde(default)]
    pub list: Vec<BybitTicker>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitTicker {
    pub symbol: String,
    pub last_price: Option<String>,
    /// Fractional, 0.05 = +5%.
    pub price24h_pcnt: Option<String>,
    pub high_price24h: Option<String>,
    pub low_price24h: Option<String>,
    pub turnover24h: Option<String>,
}
