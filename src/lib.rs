pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod execution;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod services;

use crate::config::{AppConfig, SharedEngineConfig};
use crate::db::DynStore;
use crate::execution::AutoTrader;
use crate::ingestion::{MarketDataClient, Pipeline};

/// Shared handles for the HTTP layer. Every field is a cheap clone.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: AppConfig,
    pub engine: SharedEngineConfig,
    pub pipeline: Pipeline,
    pub market_client: MarketDataClient,
    pub trader: AutoTrader,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
