use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use thiserror::Error;

use crate::models::{MarketSnapshot, MarketSource};

use super::normalizer;

const COINGECKO_MARKETS_URL: &str = "https://api.coingecko.com/api/v3/coins/markets\
    ?vs_currency=usd&order=volume_desc&per_page=100&page=1&price_change_percentage=24h";
const KUCOIN_TICKERS_URL: &str = "https://api.kucoin.com/api/v1/market/allTickers";
const BYBIT_TICKERS_URL: &str = "https://api.bybit.com/v5/market/tickers?category=spot";

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned HTTP {status}")]
    Status {
        provider: MarketSource,
        status: reqwest::StatusCode,
    },

    #[error("{provider} did not answer within {secs}s")]
    Timeout { provider: MarketSource, secs: u64 },

    #[error("malformed {provider} payload: {detail}")]
    Malformed {
        provider: MarketSource,
        detail: String,
    },
}

/// Pulls one batch of snapshots from a public market-data provider.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    http: Client,
    timeout: Duration,
}

impl MarketDataClient {
    pub fn new(http: Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub fn endpoint(source: MarketSource) -> &'static str {
        match source {
            MarketSource::CoinGecko => COINGECKO_MARKETS_URL,
            MarketSource::KuCoin => KUCOIN_TICKERS_URL,
            MarketSource::Bybit => BYBIT_TICKERS_URL,
        }
    }

    /// Fetch and normalize a full batch. The whole call is bounded by the
    /// client timeout; a late or malformed answer yields no snapshots at all.
    pub async fn fetch_snapshots(
        &self,
        source: MarketSource,
    ) -> Result<Vec<MarketSnapshot>, MarketDataError> {
        match tokio::time::timeout(self.timeout, self.fetch_raw(source)).await {
            Ok(Ok(body)) => normalizer::normalize(source, &body, Utc::now()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MarketDataError::Timeout {
                provider: source,
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn fetch_raw(&self, source: MarketSource) -> Result<Vec<u8>, MarketDataError> {
        let resp = self
            .http
            .get(Self::endpoint(source))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketDataError::Status {
                provider: source,
                status,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
