use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{
    CloseReason, PumpDumpEvent, Signal, SignalStats, SignalStatus, StageCheck, Trade, TradeClose,
    TradeStats, TradeStatus, WhaleEvent, WhaleFlow,
};

use super::Store;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, verify connectivity and bring the schema up to date.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        // Verify connectivity
        sqlx::query("SELECT 1").execute(&pool).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct WhaleEventRow {
    id: Uuid,
    symbol: String,
    price: Decimal,
    volume: Decimal,
    change_pct: Decimal,
    side: String,
    confidence: Decimal,
    detected_at: DateTime<Utc>,
}

impl TryFrom<WhaleEventRow> for WhaleEvent {
    type Error = anyhow::Error;

    fn try_from(r: WhaleEventRow) -> anyhow::Result<Self> {
        Ok(WhaleEvent {
            id: r.id,
            symbol: r.symbol,
            price: r.price,
            volume: r.volume,
            change_pct: r.change_pct,
            side: r.side.parse()?,
            confidence: r.confidence,
            detected_at: r.detected_at,
        })
    }
}

#[derive(FromRow)]
struct PumpDumpRow {
    id: Uuid,
    symbol: String,
    price: Decimal,
    prev_price: Decimal,
    change_pct: Decimal,
    kind: String,
    volume: Decimal,
    detected_at: DateTime<Utc>,
}

impl TryFrom<PumpDumpRow> for PumpDumpEvent {
    type Error = anyhow::Error;

    fn try_from(r: PumpDumpRow) -> anyhow::Result<Self> {
        Ok(PumpDumpEvent {
            id: r.id,
            symbol: r.symbol,
            price: r.price,
            prev_price: r.prev_price,
            change_pct: r.change_pct,
            kind: r.kind.parse()?,
            volume: r.volume,
            detected_at: r.detected_at,
        })
    }
}

#[derive(FromRow)]
struct SignalRow {
    id: Uuid,
    whale_event_id: Uuid,
    symbol: String,
    direction: String,
    entry_price: Decimal,
    volume: Decimal,
    trend: String,
    whale_flow: String,
    stage1_price: Option<Decimal>,
    stage1_change: Option<Decimal>,
    stage1_passed: Option<bool>,
    stage1_at: Option<DateTime<Utc>>,
    stage2_price: Option<Decimal>,
    stage2_change: Option<Decimal>,
    stage2_passed: Option<bool>,
    stage2_at: Option<DateTime<Utc>>,
    stage3_price: Option<Decimal>,
    stage3_change: Option<Decimal>,
    stage3_passed: Option<bool>,
    stage3_at: Option<DateTime<Utc>>,
    status: String,
    score: i32,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

fn stage_from_columns(
    price: Option<Decimal>,
    change_pct: Option<Decimal>,
    passed: Option<bool>,
    checked_at: Option<DateTime<Utc>>,
) -> Option<StageCheck> {
    Some(StageCheck {
        price: price?,
        change_pct: change_pct?,
        passed: passed?,
        checked_at: checked_at?,
    })
}

impl TryFrom<SignalRow> for Signal {
    type Error = anyhow::Error;

    fn try_from(r: SignalRow) -> anyhow::Result<Self> {
        Ok(Signal {
            id: r.id,
            whale_event_id: r.whale_event_id,
            symbol: r.symbol,
            direction: r.direction.parse()?,
            entry_price: r.entry_price,
            volume: r.volume,
            trend: r.trend.parse()?,
            whale_flow: r.whale_flow.parse()?,
            stages: [
                stage_from_columns(r.stage1_price, r.stage1_change, r.stage1_passed, r.stage1_at),
                stage_from_columns(r.stage2_price, r.stage2_change, r.stage2_passed, r.stage2_at),
                stage_from_columns(r.stage3_price, r.stage3_change, r.stage3_passed, r.stage3_at),
            ],
            status: r.status.parse()?,
            score: r.score,
            created_at: r.created_at,
            validated_at: r.validated_at,
        })
    }
}

#[derive(FromRow)]
struct TradeRow {
    id: Uuid,
    signal_id: Uuid,
    symbol: String,
    side: String,
    entry_price: Decimal,
    amount: Decimal,
    leverage: i32,
    stop_loss: Decimal,
    take_profit: Decimal,
    exchange: String,
    status: String,
    order_status: String,
    order_id: Option<String>,
    opened_at: DateTime<Utc>,
    exit_price: Option<Decimal>,
    close_reason: Option<String>,
    pnl: Option<Decimal>,
    pnl_percent: Option<Decimal>,
    commission: Option<Decimal>,
    net_pnl: Option<Decimal>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = anyhow::Error;

    fn try_from(r: TradeRow) -> anyhow::Result<Self> {
        let close = match (
            r.exit_price,
            r.close_reason,
            r.pnl,
            r.pnl_percent,
            r.commission,
            r.net_pnl,
            r.closed_at,
        ) {
            (
                Some(exit_price),
                Some(reason),
                Some(pnl),
                Some(pnl_percent),
                Some(commission),
                Some(net_pnl),
                Some(closed_at),
            ) => Some(TradeClose {
                exit_price,
                reason: reason.parse::<CloseReason>()?,
                pnl,
                pnl_percent,
                commission,
                net_pnl,
                closed_at,
            }),
            _ => None,
        };

        Ok(Trade {
            id: r.id,
            signal_id: r.signal_id,
            symbol: r.symbol,
            side: r.side.parse()?,
            entry_price: r.entry_price,
            amount: r.amount,
            leverage: r.leverage,
            stop_loss: r.stop_loss,
            take_profit: r.take_profit,
            exchange: r.exchange,
            status: r.status.parse()?,
            order_status: r.order_status.parse()?,
            order_id: r.order_id,
            opened_at: r.opened_at,
            close,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> anyhow::Result<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

// Stage columns only fill in (never overwrite) and a terminal status is never
// replaced by a different one.
const UPSERT_SIGNAL: &str = r#"
    INSERT INTO signals (
        id, whale_event_id, symbol, direction, entry_price, volume, trend, whale_flow,
        stage1_price, stage1_change, stage1_passed, stage1_at,
        stage2_price, stage2_change, stage2_passed, stage2_at,
        stage3_price, stage3_change, stage3_passed, stage3_at,
        status, score, created_at, validated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
            $9, $10, $11, $12,
            $13, $14, $15, $16,
            $17, $18, $19, $20,
            $21, $22, $23, $24)
    ON CONFLICT (id) DO UPDATE SET
        stage1_price  = COALESCE(signals.stage1_price,  EXCLUDED.stage1_price),
        stage1_change = COALESCE(signals.stage1_change, EXCLUDED.stage1_change),
        stage1_passed = COALESCE(signals.stage1_passed, EXCLUDED.stage1_passed),
        stage1_at     = COALESCE(signals.stage1_at,     EXCLUDED.stage1_at),
        stage2_price  = COALESCE(signals.stage2_price,  EXCLUDED.stage2_price),
        stage2_change = COALESCE(signals.stage2_change, EXCLUDED.stage2_change),
        stage2_passed = COALESCE(signals.stage2_passed, EXCLUDED.stage2_passed),
        stage2_at     = COALESCE(signals.stage2_at,     EXCLUDED.stage2_at),
        stage3_price  = COALESCE(signals.stage3_price,  EXCLUDED.stage3_price),
        stage3_change = COALESCE(signals.stage3_change, EXCLUDED.stage3_change),
        stage3_passed = COALESCE(signals.stage3_passed, EXCLUDED.stage3_passed),
        stage3_at     = COALESCE(signals.stage3_at,     EXCLUDED.stage3_at),
        status        = EXCLUDED.status,
        score         = EXCLUDED.score,
        validated_at  = COALESCE(signals.validated_at, EXCLUDED.validated_at)
    WHERE signals.status = 'pending' OR signals.status = EXCLUDED.status
"#;

// A closed trade keeps its close columns; order bookkeeping may still land.
const UPSERT_TRADE: &str = r#"
    INSERT INTO trades (
        id, signal_id, symbol, side, entry_price, amount, leverage, stop_loss, take_profit,
        exchange, status, order_status, order_id, opened_at,
        exit_price, close_reason, pnl, pnl_percent, commission, net_pnl, closed_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
            $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21)
    ON CONFLICT (id) DO UPDATE SET
        status       = CASE WHEN trades.status = 'closed' THEN trades.status ELSE EXCLUDED.status END,
        order_status = EXCLUDED.order_status,
        order_id     = COALESCE(EXCLUDED.order_id, trades.order_id),
        exit_price   = COALESCE(trades.exit_price,   EXCLUDED.exit_price),
        close_reason = COALESCE(trades.close_reason, EXCLUDED.close_reason),
        pnl          = COALESCE(trades.pnl,          EXCLUDED.pnl),
        pnl_percent  = COALESCE(trades.pnl_percent,  EXCLUDED.pnl_percent),
        commission   = COALESCE(trades.commission,   EXCLUDED.commission),
        net_pnl      = COALESCE(trades.net_pnl,      EXCLUDED.net_pnl),
        closed_at    = COALESCE(trades.closed_at,    EXCLUDED.closed_at)
"#;

impl PgStore {
    async fn upsert_signal(&self, s: &Signal) -> anyhow::Result<()> {
        let stage = |i: usize| s.stages[i].as_ref();
        sqlx::query(UPSERT_SIGNAL)
            .bind(s.id)
            .bind(s.whale_event_id)
            .bind(&s.symbol)
            .bind(s.direction.as_str())
            .bind(s.entry_price)
            .bind(s.volume)
            .bind(s.trend.as_str())
            .bind(s.whale_flow.as_str())
            .bind(stage(0).map(|c| c.price))
            .bind(stage(0).map(|c| c.change_pct))
            .bind(stage(0).map(|c| c.passed))
            .bind(stage(0).map(|c| c.checked_at))
            .bind(stage(1).map(|c| c.price))
            .bind(stage(1).map(|c| c.change_pct))
            .bind(stage(1).map(|c| c.passed))
            .bind(stage(1).map(|c| c.checked_at))
            .bind(stage(2).map(|c| c.price))
            .bind(stage(2).map(|c| c.change_pct))
            .bind(stage(2).map(|c| c.passed))
            .bind(stage(2).map(|c| c.checked_at))
            .bind(s.status.as_str())
            .bind(s.score)
            .bind(s.created_at)
            .bind(s.validated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_trade(&self, t: &Trade) -> anyhow::Result<()> {
        let close = t.close.as_ref();
        sqlx::query(UPSERT_TRADE)
            .bind(t.id)
            .bind(t.signal_id)
            .bind(&t.symbol)
            .bind(t.side.as_str())
            .bind(t.entry_price)
            .bind(t.amount)
            .bind(t.leverage)
            .bind(t.stop_loss)
            .bind(t.take_profit)
            .bind(&t.exchange)
            .bind(t.status.as_str())
            .bind(t.order_status.as_str())
            .bind(t.order_id.as_deref())
            .bind(t.opened_at)
            .bind(close.map(|c| c.exit_price))
            .bind(close.map(|c| c.reason.as_str()))
            .bind(close.map(|c| c.pnl))
            .bind(close.map(|c| c.pnl_percent))
            .bind(close.map(|c| c.commission))
            .bind(close.map(|c| c.net_pnl))
            .bind(close.map(|c| c.closed_at))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn save_whale_event(&self, e: &WhaleEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO whale_events (id, symbol, price, volume, change_pct, side, confidence, detected_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(e.id)
        .bind(&e.symbol)
        .bind(e.price)
        .bind(e.volume)
        .bind(e.change_pct)
        .bind(e.side.as_str())
        .bind(e.confidence)
        .bind(e.detected_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_pump_dump(&self, e: &PumpDumpEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pump_dumps (id, symbol, price, prev_price, change_pct, kind, volume, detected_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(e.id)
        .bind(&e.symbol)
        .bind(e.price)
        .bind(e.prev_price)
        .bind(e.change_pct)
        .bind(e.kind.as_str())
        .bind(e.volume)
        .bind(e.detected_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        self.upsert_signal(signal).await
    }

    async fn update_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        self.upsert_signal(signal).await
    }

    async fn save_trade(&self, trade: &Trade) -> anyhow::Result<()> {
        self.upsert_trade(trade).await
    }

    async fn update_trade(&self, trade: &Trade) -> anyhow::Result<()> {
        self.upsert_trade(trade).await
    }

    async fn query_pending_signals(&self) -> anyhow::Result<Vec<Signal>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            "SELECT * FROM signals WHERE status = 'pending' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn query_valid_signals(&self, min_score: i32, limit: i64) -> anyhow::Result<Vec<Signal>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
            SELECT * FROM signals
            WHERE status = 'valid' AND score >= $1
            ORDER BY score DESC, created_at ASC
            LIMIT $2
            "#,
        )
        .bind(min_score)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn query_untraded_valid_signals(
        &self,
        min_score: i32,
        limit: i64,
    ) -> anyhow::Result<Vec<Signal>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
            SELECT * FROM signals
            WHERE status = 'valid' AND score >= $1
              AND NOT EXISTS (SELECT 1 FROM trades t WHERE t.signal_id = signals.id)
            ORDER BY score DESC, created_at ASC
            LIMIT $2
            "#,
        )
        .bind(min_score)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn query_signals(
        &self,
        status: Option<SignalStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Signal>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
            SELECT * FROM signals
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn signal_stats(&self) -> anyhow::Result<SignalStats> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'valid'),
                COUNT(*) FILTER (WHERE status = 'invalid'),
                COUNT(*) FILTER (WHERE status = 'pending')
            FROM signals
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SignalStats::from_counts(row.0, row.1, row.2))
    }

    async fn query_whale_events(&self, limit: i64) -> anyhow::Result<Vec<WhaleEvent>> {
        let rows = sqlx::query_as::<_, WhaleEventRow>(
            "SELECT * FROM whale_events ORDER BY detected_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn whale_flow(&self, since: DateTime<Utc>) -> anyhow::Result<WhaleFlow> {
        let row: (Option<Decimal>, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(volume) FILTER (WHERE side = 'buy'), 0),
                COALESCE(SUM(volume) FILTER (WHERE side = 'sell'), 0)
            FROM whale_events
            WHERE detected_at > $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(WhaleFlow::new(
            row.0.unwrap_or(Decimal::ZERO),
            row.1.unwrap_or(Decimal::ZERO),
        ))
    }

    async fn query_pump_dumps(&self, limit: i64) -> anyhow::Result<Vec<PumpDumpEvent>> {
        let rows = sqlx::query_as::<_, PumpDumpRow>(
            "SELECT * FROM pump_dumps ORDER BY detected_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn query_trades(
        &self,
        status: Option<TradeStatus>,
        limit: i64,
    ) -> anyhow::Result<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            r#"
            SELECT * FROM trades
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY opened_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn query_open_trades(&self) -> anyhow::Result<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT * FROM trades WHERE status = 'open' ORDER BY opened_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn trade_stats(&self, since: DateTime<Utc>) -> anyhow::Result<TradeStats> {
        let rows: Vec<(Option<Decimal>, Option<Decimal>)> = sqlx::query_as(
            r#"
            SELECT net_pnl, commission FROM trades
            WHERE status = 'closed' AND opened_at >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(TradeStats::from_closed(rows.into_iter().map(|(net, comm)| {
            (
                net.unwrap_or(Decimal::ZERO),
                comm.unwrap_or(Decimal::ZERO),
            )
        })))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
