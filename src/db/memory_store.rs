use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    PumpDumpEvent, Signal, SignalStats, SignalStatus, Trade, TradeStats, TradeStatus, WhaleEvent,
    WhaleFlow, WhaleSide,
};

use super::Store;

/// In-process store with the same upsert/query semantics as [`super::PgStore`].
///
/// Used when no `DATABASE_URL` is configured and by the integration tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    whale_events: HashMap<Uuid, WhaleEvent>,
    pump_dumps: HashMap<Uuid, PumpDumpEvent>,
    signals: HashMap<Uuid, Signal>,
    trades: HashMap<Uuid, Trade>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Same rules as the Postgres upsert: populated stages are never overwritten
/// and a terminal status is never replaced by a different one.
fn merge_signal(existing: &Signal, incoming: &Signal) -> Option<Signal> {
    if !existing.is_pending() && existing.status != incoming.status {
        return None;
    }
    let mut merged = incoming.clone();
    for (slot, prev) in merged.stages.iter_mut().zip(existing.stages.iter()) {
        if prev.is_some() {
            *slot = prev.clone();
        }
    }
    merged.validated_at = existing.validated_at.or(incoming.validated_at);
    Some(merged)
}

/// A closed trade keeps its outcome; only order bookkeeping can still change.
fn merge_trade(existing: &Trade, incoming: &Trade) -> Trade {
    if existing.is_open() {
        return incoming.clone();
    }
    let mut merged = existing.clone();
    merged.order_status = incoming.order_status;
    merged.order_id = incoming.order_id.clone().or_else(|| existing.order_id.clone());
    merged
}

fn take<T>(items: Vec<T>, limit: i64) -> Vec<T> {
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    items.into_iter().take(limit).collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_whale_event(&self, event: &WhaleEvent) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        inner.whale_events.insert(event.id, event.clone());
        Ok(())
    }

    async fn save_pump_dump(&self, event: &PumpDumpEvent) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        inner.pump_dumps.insert(event.id, event.clone());
        Ok(())
    }

    async fn save_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        let next = match inner.signals.get(&signal.id) {
            Some(existing) => merge_signal(existing, signal),
            None => Some(signal.clone()),
        };
        if let Some(next) = next {
            inner.signals.insert(signal.id, next);
        }
        Ok(())
    }

    async fn update_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        self.save_signal(signal).await
    }

    async fn save_trade(&self, trade: &Trade) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        let next = match inner.trades.get(&trade.id) {
            Some(existing) => merge_trade(existing, trade),
            None => trade.clone(),
        };
        inner.trades.insert(trade.id, next);
        Ok(())
    }

    async fn update_trade(&self, trade: &Trade) -> anyhow::Result<()> {
        self.save_trade(trade).await
    }

    async fn query_pending_signals(&self) -> anyhow::Result<Vec<Signal>> {
        let inner = self.inner.read().await;
        let mut pending: Vec<Signal> = inner
            .signals
            .values()
            .filter(|s| s.status == SignalStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|s| s.created_at);
        Ok(pending)
    }

    async fn query_valid_signals(&self, min_score: i32, limit: i64) -> anyhow::Result<Vec<Signal>> {
        let inner = self.inner.read().await;
        let mut valid: Vec<Signal> = inner
            .signals
            .values()
            .filter(|s| s.status == SignalStatus::Valid && s.score >= min_score)
            .cloned()
            .collect();
        // Ties go to the older signal so selection is deterministic.
        valid.sort_by(|a, b| b.score.cmp(&a.score).then(a.created_at.cmp(&b.created_at)));
        Ok(take(valid, limit))
    }

    async fn query_untraded_valid_signals(
        &self,
        min_score: i32,
        limit: i64,
    ) -> anyhow::Result<Vec<Signal>> {
        let inner = self.inner.read().await;
        let traded: HashSet<Uuid> = inner.trades.values().map(|t| t.signal_id).collect();
        let mut valid: Vec<Signal> = inner
            .signals
            .values()
            .filter(|s| s.status == SignalStatus::Valid && s.score >= min_score)
            .filter(|s| !traded.contains(&s.id))
            .cloned()
            .collect();
        valid.sort_by(|a, b| b.score.cmp(&a.score).then(a.created_at.cmp(&b.created_at)));
        Ok(take(valid, limit))
    }

    async fn query_signals(
        &self,
        status: Option<SignalStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Signal>> {
        let inner = self.inner.read().await;
        let mut signals: Vec<Signal> = inner
            .signals
            .values()
            .filter(|s| status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        signals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(take(signals, limit))
    }

    async fn signal_stats(&self) -> anyhow::Result<SignalStats> {
        let inner = self.inner.read().await;
        let count = |status: SignalStatus| {
            inner
                .signals
                .values()
                .filter(|s| s.status == status)
                .count() as i64
        };
        Ok(SignalStats::from_counts(
            count(SignalStatus::Valid),
            count(SignalStatus::Invalid),
            count(SignalStatus::Pending),
        ))
    }

    async fn query_whale_events(&self, limit: i64) -> anyhow::Result<Vec<WhaleEvent>> {
        let inner = self.inner.read().await;
        let mut events: Vec<WhaleEvent> = inner.whale_events.values().cloned().collect();
        events.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        Ok(take(events, limit))
    }

    async fn whale_flow(&self, since: DateTime<Utc>) -> anyhow::Result<WhaleFlow> {
        let inner = self.inner.read().await;
        let mut inflow = Decimal::ZERO;
        let mut outflow = Decimal::ZERO;
        for event in inner.whale_events.values().filter(|e| e.detected_at > since) {
            match event.side {
                WhaleSide::Buy => inflow += event.volume,
                WhaleSide::Sell => outflow += event.volume,
            }
        }
        Ok(WhaleFlow::new(inflow, outflow))
    }

    async fn query_pump_dumps(&self, limit: i64) -> anyhow::Result<Vec<PumpDumpEvent>> {
        let inner = self.inner.read().await;
        let mut events: Vec<PumpDumpEvent> = inner.pump_dumps.values().cloned().collect();
        events.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        Ok(take(events, limit))
    }

    async fn query_trades(
        &self,
        status: Option<TradeStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Trade>> {
        let inner = self.inner.read().await;
        let mut trades: Vec<Trade> = inner
            .trades
            .values()
            .filter(|t| status.map_or(true, |st| t.status == st))
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(take(trades, limit))
    }

    async fn query_open_trades(&self) -> anyhow::Result<Vec<Trade>> {
        let mut open = self.query_trades(Some(TradeStatus::Open), i64::MAX).await?;
        open.reverse();
        Ok(open)
    }

    async fn trade_stats(&self, since: DateTime<Utc>) -> anyhow::Result<TradeStats> {
        let inner = self.inner.read().await;
        Ok(TradeStats::from_closed(
            inner
                .trades
                .values()
                .filter(|t| t.status == TradeStatus::Closed && t.opened_at >= since)
                .filter_map(|t| t.close.as_ref().map(|c| (c.net_pnl, c.commission))),
        ))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
