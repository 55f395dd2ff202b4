pub mod engine;

pub use engine::{ConfigError, EngineConfig, SharedEngineConfig};

use std::env;
use std::path::Path;

use crate::models::MarketSource;

const DEFAULT_EXCHANGE_URL: &str = "https://api.lbkex.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL. When unset the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Bearer token for `/api/*`. Unset disables auth (dev mode).
    pub api_token: Option<String>,

    // Market data
    pub market_source: MarketSource,
    pub market_poll_interval_secs: u64,
    pub http_timeout_secs: u64,

    // Exchange (optional, both keys required for live order placement)
    pub exchange_name: String,
    pub exchange_base_url: String,
    pub exchange_api_key: Option<String>,
    pub exchange_secret_key: Option<String>,

    // Auto-trader
    pub trader_interval_secs: u64,
    pub auto_trade_on_start: bool,

    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let market_source = env::var("MARKET_SOURCE")
            .unwrap_or_else(|_| "coingecko".into())
            .parse::<MarketSource>()?;

        let engine = match env::var("ENGINE_CONFIG_PATH").ok().filter(|p| !p.is_empty()) {
            Some(path) => load_engine_config(Path::new(&path))?,
            None => EngineConfig::default(),
        };
        engine.validate()?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            api_token: env::var("API_TOKEN").ok().filter(|s| !s.is_empty()),

            market_source,
            market_poll_interval_secs: env::var("MARKET_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),

            exchange_name: env::var("EXCHANGE_NAME").unwrap_or_else(|_| "lbank".into()),
            exchange_base_url: env::var("EXCHANGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_EXCHANGE_URL.into()),
            exchange_api_key: env::var("EXCHANGE_API_KEY").ok().filter(|s| !s.is_empty()),
            exchange_secret_key: env::var("EXCHANGE_SECRET_KEY").ok().filter(|s| !s.is_empty()),

            trader_interval_secs: env::var("TRADER_INTERVAL_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            auto_trade_on_start: env::var("AUTO_TRADE_ON_START")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),

            engine,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 8080,
            api_token: None,
            market_source: MarketSource::CoinGecko,
            market_poll_interval_secs: 30,
            http_timeout_secs: 10,
            exchange_name: "paper".into(),
            exchange_base_url: DEFAULT_EXCHANGE_URL.into(),
            exchange_api_key: None,
            exchange_secret_key: None,
            trader_interval_secs: 10,
            auto_trade_on_start: false,
            engine: EngineConfig::default(),
        }
    }
}

/// Read an `EngineConfig` from a JSON file. Missing keys take defaults,
/// unknown keys are an error.
pub fn load_engine_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read engine config {}: {e}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid engine config {}: {e}", path.display()))?;
    Ok(config)
}
