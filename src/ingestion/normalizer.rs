use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{MarketSnapshot, MarketSource};

use super::market_client::MarketDataError;
use super::types::{BybitResponse, CoinGeckoMarket, KuCoinResponse};

/// Exchanges that list every pair get capped to this many USDT pairs.
const MAX_TICKER_SYMBOLS: usize = 100;

/// Turn a raw provider body into snapshots.
///
/// Any structural problem fails the whole batch. Individual entries without a
/// positive price are skipped; they carry no usable observation.
pub fn normalize(
    source: MarketSource,
    body: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Vec<MarketSnapshot>, MarketDataError> {
    match source {
        MarketSource::CoinGecko => normalize_coingecko(body, timestamp),
        MarketSource::KuCoin => normalize_kucoin(body, timestamp),
        MarketSource::Bybit => normalize_bybit(body, timestamp),
    }
}

fn malformed(source: MarketSource, detail: impl std::fmt::Display) -> MarketDataError {
    MarketDataError::Malformed {
        provider: source,
        detail: detail.to_string(),
    }
}

/// Parse an optional numeric string. Missing/empty reads as zero, garbage is
/// an error.
fn parse_num(
    source: MarketSource,
    field: &str,
    raw: Option<&str>,
) -> Result<Decimal, MarketDataError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Decimal::ZERO),
        Some(s) => Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|e| malformed(source, format!("{field}={s:?}: {e}"))),
    }
}

fn normalize_coingecko(
    body: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Vec<MarketSnapshot>, MarketDataError> {
    let source = MarketSource::CoinGecko;
    let markets: Vec<CoinGeckoMarket> =
        serde_json::from_slice(body).map_err(|e| malformed(source, e))?;

    Ok(markets
        .into_iter()
        .filter_map(|m| {
            let price = m.current_price.filter(|p| *p > Decimal::ZERO)?;
            Some(MarketSnapshot {
                symbol: format!("{}USDT", m.symbol.to_uppercase()),
                price,
                change_pct: m.price_change_percentage_24h.unwrap_or_default(),
                high: m.high_24h.unwrap_or(price),
                low: m.low_24h.unwrap_or(price),
                volume: m.total_volume.unwrap_or_default(),
                source,
                timestamp,
            })
        })
        .collect())
}

fn normalize_kucoin(
    body: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Vec<MarketSnapshot>, MarketDataError> {
    let source = MarketSource::KuCoin;
    let response: KuCoinResponse =
        serde_json::from_slice(body).map_err(|e| malformed(source, e))?;

    let mut snapshots = Vec::new();
    for t in response
        .data
        .ticker
        .iter()
        .filter(|t| t.symbol.ends_with("-USDT"))
    {
        if snapshots.len() >= MAX_TICKER_SYMBOLS {
            break;
        }
        let price = parse_num(source, "last", t.last.as_deref())?;
        if price <= Decimal::ZERO {
            continue;
        }
        snapshots.push(MarketSnapshot {
            symbol: t.symbol.replacen('-', "", 1),
            price,
            change_pct: parse_num(source, "changeRate", t.change_rate.as_deref())?
                * Decimal::ONE_HUNDRED,
            high: parse_num(source, "high", t.high.as_deref())?,
            low: parse_num(source, "low", t.low.as_deref())?,
            volume: parse_num(source, "volValue", t.vol_value.as_deref())?,
            source,
            timestamp,
        });
    }
    Ok(snapshots)
}

fn normalize_bybit(
    body: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Vec<MarketSnapshot>, MarketDataError> {
    let source = MarketSource::Bybit;
    let response: BybitResponse =
        serde_json::from_slice(body).map_err(|e| malformed(source, e))?;

    let mut snapshots = Vec::new();
    for t in response
        .result
        .list
        .iter()
        .filter(|t| t.symbol.ends_with("USDT"))
    {
        if snapshots.len() >= MAX_TICKER_SYMBOLS {
            break;
        }
        let price = parse_num(source, "lastPrice", t.last_price.as_deref())?;
        if price <= Decimal::ZERO {
            continue;
        }
        snapshots.push(MarketSnapshot {
            symbol: t.symbol.clone(),
            price,
            change_pct: parse_num(source, "price24hPcnt", t.price24h_pcnt.as_deref())?
                * Decimal::ONE_HUNDRED,
            high: parse_num(source, "highPrice24h", t.high_price24h.as_deref())?,
            low: parse_num(source, "lowPrice24h", t.low_price24h.as_deref())?,
            volume: parse_num(source, "turnover24h", t.turnover24h.as_deref())?,
            source,
            timestamp,
        });
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coingecko_symbols_get_usdt_suffix() {
        let body = br#"[
            {"symbol":"btc","current_price":65000.5,"price_change_percentage_24h":-1.25,
             "high_24h":66000,"low_24h":64000,"total_volume":31000000000},
            {"symbol":"dead","current_price":null}
        ]"#;
        let snaps = normalize(MarketSource::CoinGecko, body, Utc::now()).unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].symbol, "BTCUSDT");
        assert_eq!(snaps[0].change_pct, Decimal::new(-125, 2));
        assert_eq!(snaps[0].volume, Decimal::from(31_000_000_000i64));
    }

    #[test]
    fn test_kucoin_filters_and_scales_change() {
        let body = br#"{"data":{"ticker":[
            {"symbol":"ETH-USDT","last":"3000","changeRate":"0.0512","high":"3100","low":"2900","volValue":"1200000"},
            {"symbol":"ETH-BTC","last":"0.05","changeRate":"0.01","high":"0.06","low":"0.04","volValue":"10"}
        ]}}"#;
        let snaps = normalize(MarketSource::KuCoin, body, Utc::now()).unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].symbol, "ETHUSDT");
        assert_eq!(snaps[0].change_pct, Decimal::new(512, 2));
    }

    #[test]
    fn test_bybit_caps_symbol_count() {
        let tickers: Vec<String> = (0..150)
            .map(|i| {
                format!(
                    r#"{{"symbol":"C{i}USDT","lastPrice":"1.5","price24hPcnt":"-0.02","highPrice24h":"2","lowPrice24h":"1","turnover24h":"1000"}}"#
                )
            })
            .collect();
        let body = format!(r#"{{"result":{{"list":[{}]}}}}"#, tickers.join(","));
        let snaps = normalize(MarketSource::Bybit, body.as_bytes(), Utc::now()).unwrap();
        assert_eq!(snaps.len(), MAX_TICKER_SYMBOLS);
        assert_eq!(snaps[0].change_pct, Decimal::from(-2));
    }

    #[test]
    fn test_malformed_payload_fails_whole_batch() {
        let body = br#"{"data":{"ticker":[
            {"symbol":"ETH-USDT","last":"3000","changeRate":"0.05","high":"3100","low":"2900","volValue":"12"},
            {"symbol":"SOL-USDT","last":"not-a-number","changeRate":"0.05","high":"1","low":"1","volValue":"1"}
        ]}}"#;
        let result = normalize(MarketSource::KuCoin, body, Utc::now());
        assert!(matches!(result, Err(MarketDataError::Malformed { .. })));

        let result = normalize(MarketSource::CoinGecko, b"<html>rate limited</html>", Utc::now());
        assert!(matches!(result, Err(MarketDataError::Malformed { .. })));
    }
}
