use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::interval;
use uuid::Uuid;

use crate::config::{EngineConfig, SharedEngineConfig};
use crate::db::DynStore;
use crate::models::{OrderStatus, Signal, Trade, TradeStatus};

use super::exchange::Exchange;
use super::risk_manager::{
    check_exit, check_gate, close_outcome, stop_and_target, RiskViolation, TraderCounters,
};

/// How many top-scored valid signals are looked at per selection.
const SELECTION_WINDOW: i64 = 50;

/// Everything the trader mutates. Only touched while holding the lock.
struct TraderState {
    running: bool,
    /// A control loop task is alive (it may be about to notice a stop).
    loop_active: bool,
    counters: TraderCounters,
    /// Open positions keyed by originating signal id.
    open: HashMap<Uuid, Trade>,
}

/// What one control-loop iteration did.
#[derive(Debug, Clone, Default)]
pub struct IterationReport {
    pub gate: Option<RiskViolation>,
    pub opened: Option<Trade>,
    pub closed: Vec<Trade>,
}

/// Point-in-time view of the trader for the API.
#[derive(Debug, Clone, Serialize)]
pub struct TraderStats {
    pub running: bool,
    /// The control loop task is still alive.
    pub loop_active: bool,
    pub exchange: String,
    pub daily_trades: u32,
    pub consecutive_losses: u32,
    pub total_trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: Decimal,
    /// Gross PnL of closed trades, before commission.
    pub total_pnl: Decimal,
    pub total_commission: Decimal,
    pub net_pnl: Decimal,
    pub open_positions: Vec<Trade>,
}

/// Risk-gated trader: opens positions from the best valid signals and closes
/// them on stop-loss or take-profit.
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct AutoTrader {
    state: Arc<Mutex<TraderState>>,
    store: DynStore,
    exchange: Arc<dyn Exchange>,
    engine: SharedEngineConfig,
    interval: Duration,
}

impl AutoTrader {
    pub fn new(
        store: DynStore,
        exchange: Arc<dyn Exchange>,
        engine: SharedEngineConfig,
        interval: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TraderState {
                running: false,
                loop_active: false,
                counters: TraderCounters::new(Utc::now().date_naive()),
                open: HashMap::new(),
            })),
            store,
            exchange,
            engine,
            interval,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Switch to running and spawn the control loop. Does nothing if already
    /// running. The open-position cache is reloaded from the store first.
    pub async fn start(&self) -> anyhow::Result<bool> {
        if self.state.lock().await.running {
            return Ok(false);
        }

        let open = self.store.query_open_trades().await?;

        let mut state = self.state.lock().await;
        if state.running {
            return Ok(false);
        }
        state.open = open.into_iter().map(|t| (t.signal_id, t)).collect();
        state.running = true;
        gauge!("open_positions").set(state.open.len() as f64);

        if !state.loop_active {
            state.loop_active = true;
            tokio::spawn(self.clone().run_loop());
        }

        tracing::info!(
            exchange = self.exchange.name(),
            open_positions = state.open.len(),
            interval_secs = self.interval.as_secs(),
            "Auto-trader started"
        );
        Ok(true)
    }

    /// Switch to stopped. The loop notices on its next tick; an iteration
    /// already in progress finishes normally.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;
        let was_running = state.running;
        state.running = false;
        if was_running {
            tracing::info!("Auto-trader stopped");
        }
        was_running
    }

    async fn run_loop(self) {
        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            {
                let mut state = self.state.lock().await;
                if !state.running {
                    state.loop_active = false;
                    tracing::debug!("Auto-trader loop exiting");
                    break;
                }
            }

            self.run_iteration(Utc::now()).await;
        }
    }

    /// One pass: gate, select, open, then monitor every open position.
    /// Never fails; problems are logged and retried next pass.
    pub async fn run_iteration(&self, now: DateTime<Utc>) -> IterationReport {
        let cfg = self.engine.read().await.clone();
        let mut report = IterationReport::default();

        match self.gate(now, &cfg).await {
            Ok(()) => match self.select_signal(&cfg).await {
                Ok(Some(signal)) => report.opened = self.open_trade(&signal, &cfg, now).await,
                Ok(None) => tracing::debug!("No tradable signal"),
                Err(e) => tracing::error!(error = %e, "Failed to query valid signals"),
            },
            Err(v) => report.gate = Some(v),
        }

        report.closed = self.monitor_positions(&cfg, now).await;
        report
    }

    async fn gate(&self, now: DateTime<Utc>, cfg: &EngineConfig) -> Result<(), RiskViolation> {
        let mut state = self.state.lock().await;
        let open_count = state.open.len();
        let result = check_gate(&mut state.counters, open_count, now.date_naive(), cfg);

        if let Err(v) = &result {
            if v.stops_trading() && state.running {
                state.running = false;
                tracing::warn!(violation = %v, "Risk limit breached, auto-trader stopping");
            } else {
                tracing::debug!(violation = %v, "Trading paused by risk gate");
            }
        }
        result
    }

    /// Best-scored valid signal that has never been traded.
    async fn select_signal(&self, cfg: &EngineConfig) -> anyhow::Result<Option<Signal>> {
        let candidates = self
            .store
            .query_untraded_valid_signals(cfg.min_score_for_trade, SELECTION_WINDOW)
            .await?;

        let state = self.state.lock().await;
        Ok(candidates
            .into_iter()
            .find(|signal| !state.open.contains_key(&signal.id)))
    }

    async fn open_trade(
        &self,
        signal: &Signal,
        cfg: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Option<Trade> {
        let (stop_loss, take_profit) = stop_and_target(
            signal.direction,
            signal.entry_price,
            cfg.stop_loss_pct,
            cfg.take_profit_pct,
        );
        let mut trade = Trade {
            id: Uuid::new_v4(),
            signal_id: signal.id,
            symbol: signal.symbol.clone(),
            side: signal.direction,
            entry_price: signal.entry_price,
            amount: cfg.trade_amount,
            leverage: i32::try_from(cfg.leverage).unwrap_or(i32::MAX),
            stop_loss,
            take_profit,
            exchange: self.exchange.name().to_string(),
            status: TradeStatus::Open,
            order_status: OrderStatus::Pending,
            order_id: None,
            opened_at: now,
            close: None,
        };

        {
            let mut state = self.state.lock().await;
            // Re-check under the lock; another pass may have raced us here.
            let open_count = state.open.len();
            if state.open.contains_key(&signal.id)
                || check_gate(&mut state.counters, open_count, now.date_naive(), cfg).is_err()
            {
                return None;
            }
            state.open.insert(signal.id, trade.clone());
            state.counters.record_open();
            gauge!("open_positions").set(state.open.len() as f64);
        }

        if let Err(e) = self.store.save_trade(&trade).await {
            tracing::error!(error = %e, trade_id = %trade.id, "Failed to persist opened trade");
        }
        counter!("trades_opened_total").increment(1);
        tracing::info!(
            trade_id = %trade.id,
            signal_id = %signal.id,
            symbol = %trade.symbol,
            side = %trade.side,
            entry = %trade.entry_price,
            stop_loss = %trade.stop_loss,
            take_profit = %trade.take_profit,
            score = signal.score,
            "Trade opened"
        );

        // Order placement is best-effort: a rejected order leaves the trade
        // open with order_status = failed.
        let qty = if trade.entry_price.is_zero() {
            Decimal::ZERO
        } else {
            trade.amount * Decimal::from(trade.leverage) / trade.entry_price
        };
        match self
            .exchange
            .place_order(&trade.symbol, trade.side, qty, trade.entry_price)
            .await
        {
            Ok(order_id) => {
                trade.order_status = if self.exchange.is_paper() {
                    OrderStatus::Simulated
                } else {
                    OrderStatus::Submitted
                };
                trade.order_id = Some(order_id);
            }
            Err(e) => {
                counter!("orders_failed_total").increment(1);
                tracing::warn!(
                    error = %e,
                    trade_id = %trade.id,
                    symbol = %trade.symbol,
                    "Order placement failed, trade stays open"
                );
                trade.order_status = OrderStatus::Failed;
            }
        }

        {
            let mut state = self.state.lock().await;
            if let Some(cached) = state.open.get_mut(&signal.id) {
                cached.order_status = trade.order_status;
                cached.order_id = trade.order_id.clone();
            }
        }
        if let Err(e) = self.store.update_trade(&trade).await {
            tracing::error!(error = %e, trade_id = %trade.id, "Failed to persist order status");
        }

        Some(trade)
    }

    /// Close every open position whose stop or target has been crossed.
    /// A symbol without a price is skipped until the next pass.
    async fn monitor_positions(&self, cfg: &EngineConfig, now: DateTime<Utc>) -> Vec<Trade> {
        let open: Vec<Trade> = self.state.lock().await.open.values().cloned().collect();
        let mut closed = Vec::new();

        for trade in open {
            let price = match self.exchange.get_current_price(&trade.symbol).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        symbol = %trade.symbol,
                        "No price for open position, retrying next pass"
                    );
                    continue;
                }
            };

            let Some(reason) = check_exit(&trade, price) else {
                continue;
            };

            let closed_trade = {
                let mut state = self.state.lock().await;
                let Some(mut current) = state.open.remove(&trade.signal_id) else {
                    continue;
                };
                let outcome = close_outcome(&current, price, reason, cfg.commission_pct, now);
                state.counters.record_close(&outcome);
                current.status = TradeStatus::Closed;
                current.close = Some(outcome);
                gauge!("open_positions").set(state.open.len() as f64);
                current
            };

            if let Err(e) = self.store.update_trade(&closed_trade).await {
                tracing::error!(error = %e, trade_id = %closed_trade.id, "Failed to persist closed trade");
            }
            counter!("trades_closed_total", "reason" => reason.as_str()).increment(1);
            tracing::info!(
                trade_id = %closed_trade.id,
                symbol = %closed_trade.symbol,
                reason = %reason,
                exit = %price,
                net_pnl = ?closed_trade.net_pnl(),
                "Trade closed"
            );
            closed.push(closed_trade);
        }

        closed
    }

    pub async fn stats(&self) -> TraderStats {
        let state = self.state.lock().await;
        let c = &state.counters;
        let finished = c.wins + c.losses;
        let win_rate = if finished > 0 {
            Decimal::from(c.wins) / Decimal::from(finished) * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let mut open_positions: Vec<Trade> = state.open.values().cloned().collect();
        open_positions.sort_by_key(|t| t.opened_at);

        TraderStats {
            running: state.running,
            loop_active: state.loop_active,
            exchange: self.exchange.name().to_string(),
            daily_trades: c.daily_trades,
            consecutive_losses: c.consecutive_losses,
            total_trades: c.total_trades,
            wins: c.wins,
            losses: c.losses,
            win_rate,
            total_pnl: c.total_pnl,
            total_commission: c.total_commission,
            net_pnl: c.total_pnl - c.total_commission,
            open_positions,
        }
    }

    /// Valid signals that qualify for a trade and have not been traded yet,
    /// best first.
    pub async fn trade_queue(&self, limit: usize) -> anyhow::Result<Vec<Signal>> {
        let min_score = self.engine.read().await.min_score_for_trade;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.store.query_untraded_valid_signals(min_score, limit).await
    }
}
