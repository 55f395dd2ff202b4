use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use whale_hunter::config::{AppConfig, EngineConfig, SharedEngineConfig};
use whale_hunter::db::{DynStore, MemoryStore};
use whale_hunter::execution::{AutoTrader, Exchange, ExchangeError, PaperExchange};
use whale_hunter::ingestion::{MarketDataClient, Pipeline};
use whale_hunter::intelligence::PriceTracker;
use whale_hunter::models::{
    Direction, MarketSnapshot, MarketSource, Signal, SignalStatus, StageCheck, Trend, WhaleFlowTag,
};
use whale_hunter::AppState;

#[allow(dead_code)]
pub fn memory_store() -> DynStore {
    Arc::new(MemoryStore::new())
}

#[allow(dead_code)]
pub fn shared_engine(cfg: EngineConfig) -> SharedEngineConfig {
    cfg.into_shared()
}

/// Snapshot whose high equals its price.
#[allow(dead_code)]
pub fn snapshot(symbol: &str, price: Decimal, volume: i64, change_pct: Decimal) -> MarketSnapshot {
    MarketSnapshot {
        symbol: symbol.into(),
        price,
        change_pct,
        high: price,
        low: price * Decimal::new(9, 1),
        volume: Decimal::from(volume),
        source: MarketSource::CoinGecko,
        timestamp: Utc::now(),
    }
}

/// A signal that already went through validation as valid.
#[allow(dead_code)]
pub fn valid_signal(symbol: &str, direction: Direction, entry: Decimal, score: i32) -> Signal {
    let now = Utc::now();
    let check = StageCheck {
        price: entry,
        change_pct: Decimal::ONE,
        passed: true,
        checked_at: now,
    };
    Signal {
        id: Uuid::new_v4(),
        whale_event_id: Uuid::new_v4(),
        symbol: symbol.into(),
        direction,
        entry_price: entry,
        volume: Decimal::from(750_000),
        trend: Trend::Bullish,
        whale_flow: WhaleFlowTag::Inflow,
        stages: [Some(check.clone()), Some(check.clone()), Some(check)],
        status: SignalStatus::Valid,
        score,
        created_at: now - chrono::Duration::minutes(5),
        validated_at: Some(now - chrono::Duration::minutes(1)),
    }
}

/// Exchange with hand-set prices and a switch to reject orders.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedExchange {
    prices: Mutex<HashMap<String, Decimal>>,
    reject_orders: Mutex<bool>,
    pub orders: Mutex<Vec<(String, Direction, Decimal)>>,
}

#[allow(dead_code)]
impl ScriptedExchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.lock().await.insert(symbol.to_string(), price);
    }

    pub async fn reject_orders(&self, reject: bool) {
        *self.reject_orders.lock().await = reject;
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Direction,
        qty: Decimal,
        _price: Decimal,
    ) -> Result<String, ExchangeError> {
        if *self.reject_orders.lock().await {
            return Err(ExchangeError::Rejected("insufficient balance".into()));
        }
        self.orders.lock().await.push((symbol.to_string(), side, qty));
        Ok(format!("ord-{}", Uuid::new_v4()))
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        self.prices
            .lock()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::NoPrice(symbol.to_string()))
    }
}

#[allow(dead_code)]
pub fn trader(store: DynStore, exchange: Arc<dyn Exchange>, cfg: EngineConfig) -> AutoTrader {
    AutoTrader::new(store, exchange, cfg.into_shared(), Duration::from_millis(50))
}

/// Full application state on the in-memory store and paper exchange.
#[allow(dead_code)]
pub fn test_state(store: DynStore, config: AppConfig) -> AppState {
    let engine = config.engine.clone().into_shared();
    let tracker = PriceTracker::new();
    let pipeline = Pipeline::new(store.clone(), tracker.clone(), engine.clone());
    let exchange: Arc<dyn Exchange> = Arc::new(PaperExchange::new(tracker));
    let trader = AutoTrader::new(
        store.clone(),
        exchange,
        engine.clone(),
        Duration::from_millis(50),
    );
    let timeout = Duration::from_secs(2);

    AppState {
        store,
        config,
        engine,
        pipeline,
        market_client: MarketDataClient::new(reqwest::Client::new(), timeout),
        trader,
        // Recorder is built but not installed globally.
        metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
    }
}

#[allow(dead_code)]
pub fn minutes_after(t0: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    t0 + chrono::Duration::minutes(minutes)
}
