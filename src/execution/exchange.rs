use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::intelligence::PriceTracker;
use crate::models::Direction;

use super::auth::{AuthError, ExchangeAuth};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange did not answer within {0}s")]
    Timeout(u64),

    #[error("signing failed: {0}")]
    Auth(#[from] AuthError),

    #[error("no price available for {0}")]
    NoPrice(String),

    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Order placement and price lookup against a venue.
#[async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &str;

    /// Whether orders only exist locally.
    fn is_paper(&self) -> bool {
        false
    }

    /// Place a market order; returns the venue's order id.
    async fn place_order(
        &self,
        symbol: &str,
        side: Direction,
        qty: Decimal,
        price: Decimal,
    ) -> Result<String, ExchangeError>;

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, ExchangeError>;
}

// ---------------------------------------------------------------------------
// Paper venue: fills locally, prices from the latest market batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PaperExchange {
    prices: PriceTracker,
}

impl PaperExchange {
    pub fn new(prices: PriceTracker) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    fn is_paper(&self) -> bool {
        true
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Direction,
        qty: Decimal,
        price: Decimal,
    ) -> Result<String, ExchangeError> {
        tracing::info!(
            symbol,
            side = %side,
            qty = %qty,
            price = %price,
            "[PAPER] Order filled locally"
        );
        Ok(format!("paper-{}", Uuid::new_v4()))
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        self.prices
            .latest(symbol)
            .await
            .ok_or_else(|| ExchangeError::NoPrice(symbol.to_string()))
    }
}

// ---------------------------------------------------------------------------
// REST venue (LBank v2 style endpoints)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    data: Vec<PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    result: bool,
    #[serde(default)]
    data: Option<OrderData>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OrderData {
    order_id: String,
}

pub struct RestExchange {
    http: Client,
    name: String,
    base_url: String,
    auth: ExchangeAuth,
    timeout: Duration,
}

impl RestExchange {
    pub fn new(
        http: Client,
        name: String,
        base_url: String,
        auth: ExchangeAuth,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            timeout,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, ExchangeError>
    where
        F: std::future::Future<Output = Result<T, ExchangeError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ExchangeError::Timeout(self.timeout.as_secs()))?
    }
}

/// `BTCUSDT` -> `btc_usdt`.
pub fn venue_symbol(symbol: &str) -> String {
    let lower = symbol.to_lowercase();
    match lower.strip_suffix("usdt") {
        Some(base) if !base.is_empty() => format!("{base}_usdt"),
        _ => lower,
    }
}

#[async_trait]
impl Exchange for RestExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Direction,
        qty: Decimal,
        price: Decimal,
    ) -> Result<String, ExchangeError> {
        let order_type = match side {
            Direction::Long => "buy_market",
            Direction::Short => "sell_market",
        };
        let params = BTreeMap::from([
            ("symbol".to_string(), venue_symbol(symbol)),
            ("type".to_string(), order_type.to_string()),
            ("amount".to_string(), qty.round_dp(6).normalize().to_string()),
            ("price".to_string(), price.normalize().to_string()),
        ]);
        let body = self
            .auth
            .signed_body(params, chrono::Utc::now().timestamp_millis())?;
        let url = format!("{}/v2/supplement/create_order.do", self.base_url);

        let resp: OrderResponse = self
            .bounded(async {
                let resp = self
                    .http
                    .post(&url)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(body)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<_, ExchangeError>(resp.json().await?)
            })
            .await?;

        match resp {
            OrderResponse {
                result: true,
                data: Some(data),
                ..
            } => Ok(data.order_id),
            OrderResponse { error_code, .. } => Err(ExchangeError::Rejected(format!(
                "error_code={}",
                error_code.unwrap_or_default()
            ))),
        }
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        let url = format!(
            "{}/v2/supplement/ticker/price.do?symbol={}",
            self.base_url,
            venue_symbol(symbol)
        );

        let resp: PriceResponse = self
            .bounded(async {
                let resp = self.http.get(&url).send().await?.error_for_status()?;
                Ok::<_, ExchangeError>(resp.json().await?)
            })
            .await?;

        resp.data
            .first()
            .map(|e| e.price)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| ExchangeError::NoPrice(symbol.to_string()))
    }
}
