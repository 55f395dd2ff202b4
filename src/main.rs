use std::sync::Arc;
use std::time::Duration;

use whale_hunter::api::create_router;
use whale_hunter::config::AppConfig;
use whale_hunter::db::{DynStore, MemoryStore, PgStore};
use whale_hunter::execution::{AutoTrader, Exchange, ExchangeAuth, PaperExchange, RestExchange};
use whale_hunter::ingestion::{MarketDataClient, Pipeline};
use whale_hunter::intelligence::PriceTracker;
use whale_hunter::services::run_market_poller;
use whale_hunter::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = whale_hunter::metrics::init_metrics()?;

    // --- Store ---
    let store: DynStore = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pg = PgStore::connect(url).await?;
            tracing::info!("Database connected, migrations applied");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (state is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let engine = config.engine.clone().into_shared();
    let timeout = Duration::from_secs(config.http_timeout_secs.max(1));
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("whale-hunter/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // --- Detection pipeline: scheduled market poll -> detector -> validator ---
    let tracker = PriceTracker::new();
    let pipeline = Pipeline::new(store.clone(), tracker.clone(), engine.clone());
    let market_client = MarketDataClient::new(http.clone(), timeout);

    tokio::spawn(run_market_poller(
        market_client.clone(),
        pipeline.clone(),
        config.market_source,
        config.market_poll_interval_secs,
    ));

    // --- Execution: exchange + auto-trader ---
    let exchange: Arc<dyn Exchange> =
        match (&config.exchange_api_key, &config.exchange_secret_key) {
            (Some(key), Some(secret)) => {
                tracing::info!(
                    exchange = %config.exchange_name,
                    base_url = %config.exchange_base_url,
                    "Exchange credentials found, orders go live"
                );
                Arc::new(RestExchange::new(
                    http.clone(),
                    config.exchange_name.clone(),
                    config.exchange_base_url.clone(),
                    ExchangeAuth::new(key.clone(), secret.clone()),
                    timeout,
                ))
            }
            _ => {
                tracing::warn!("No exchange credentials, auto-trader runs on the paper exchange");
                Arc::new(PaperExchange::new(tracker.clone()))
            }
        };

    let trader = AutoTrader::new(
        store.clone(),
        exchange,
        engine.clone(),
        Duration::from_secs(config.trader_interval_secs.max(1)),
    );
    if config.auto_trade_on_start {
        trader.start().await?;
    }

    let state = AppState {
        store,
        config,
        engine,
        pipeline,
        market_client,
        trader,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
