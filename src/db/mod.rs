pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    PumpDumpEvent, Signal, SignalStats, SignalStatus, Trade, TradeStats, TradeStatus, WhaleEvent,
    WhaleFlow,
};

/// Shared handle to whichever store backs the service.
pub type DynStore = Arc<dyn Store>;

/// Persistence collaborator for events, signals and trades.
///
/// Every `save_*` / `update_*` is an upsert keyed by entity id, so a caller may
/// replay a write after a failure without creating duplicates.
#[async_trait]
pub trait Store: Send + Sync {
    async fn save_whale_event(&self, event: &WhaleEvent) -> anyhow::Result<()>;
    async fn save_pump_dump(&self, event: &PumpDumpEvent) -> anyhow::Result<()>;

    async fn save_signal(&self, signal: &Signal) -> anyhow::Result<()>;
    async fn update_signal(&self, signal: &Signal) -> anyhow::Result<()>;

    async fn save_trade(&self, trade: &Trade) -> anyhow::Result<()>;
    async fn update_trade(&self, trade: &Trade) -> anyhow::Result<()>;

    /// Pending signals, oldest first.
    async fn query_pending_signals(&self) -> anyhow::Result<Vec<Signal>>;

    /// Valid signals with `score >= min_score`, best score first.
    async fn query_valid_signals(&self, min_score: i32, limit: i64) -> anyhow::Result<Vec<Signal>>;

    /// Like [`Store::query_valid_signals`], minus every signal a trade was
    /// ever opened from. The exclusion happens before the limit.
    async fn query_untraded_valid_signals(
        &self,
        min_score: i32,
        limit: i64,
    ) -> anyhow::Result<Vec<Signal>>;

    /// Signals newest first, optionally filtered by status.
    async fn query_signals(
        &self,
        status: Option<SignalStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Signal>>;

    async fn signal_stats(&self) -> anyhow::Result<SignalStats>;

    /// Whale events newest first.
    async fn query_whale_events(&self, limit: i64) -> anyhow::Result<Vec<WhaleEvent>>;

    /// Buy vs sell whale volume detected since `since`.
    async fn whale_flow(&self, since: DateTime<Utc>) -> anyhow::Result<WhaleFlow>;

    /// Pump/dump events newest first.
    async fn query_pump_dumps(&self, limit: i64) -> anyhow::Result<Vec<PumpDumpEvent>>;

    /// Trades newest first, optionally filtered by status.
    async fn query_trades(
        &self,
        status: Option<TradeStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Trade>>;

    async fn query_open_trades(&self) -> anyhow::Result<Vec<Trade>>;

    /// Stats over trades closed that were opened at or after `since`.
    async fn trade_stats(&self, since: DateTime<Utc>) -> anyhow::Result<TradeStats>;

    /// Cheap liveness check for the health endpoint.
    async fn ping(&self) -> anyhow::Result<()>;
}
