mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use whale_hunter::config::EngineConfig;
use whale_hunter::execution::{Exchange, RiskViolation};
use whale_hunter::models::{CloseReason, Direction, OrderStatus, TradeStatus};

use common::{memory_store, trader, valid_signal, ScriptedExchange};

fn relaxed_config() -> EngineConfig {
    EngineConfig {
        max_open_positions: 10,
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn test_daily_trade_limit_blocks_fifth_open() {
    let store = memory_store();
    for (i, score) in [90, 85, 80, 75, 70].into_iter().enumerate() {
        let s = valid_signal(&format!("COIN{i}USDT"), Direction::Long, Decimal::from(10), score);
        store.save_signal(&s).await.unwrap();
    }
    let exchange = ScriptedExchange::new();
    let t = trader(store.clone(), exchange.clone(), relaxed_config());
    let now = Utc::now();

    for _ in 0..4 {
        let report = t.run_iteration(now).await;
        assert!(report.gate.is_none());
        assert!(report.opened.is_some());
    }

    let blocked = t.run_iteration(now).await;
    assert!(blocked.opened.is_none());
    assert!(matches!(
        blocked.gate,
        Some(RiskViolation::DailyLimitReached { current: 4, max: 4 })
    ));
    assert_eq!(store.query_open_trades().await.unwrap().len(), 4);
    // Hitting the daily cap pauses opening but does not stop the trader.
    assert_eq!(t.stats().await.daily_trades, 4);

    let next_day = t.run_iteration(now + Duration::days(1)).await;
    assert!(next_day.gate.is_none());
    assert_eq!(next_day.opened.unwrap().symbol, "COIN4USDT");
}

#[tokio::test]
async fn test_best_signal_opens_with_stops_and_order() {
    let store = memory_store();
    store
        .save_signal(&valid_signal("ETHUSDT", Direction::Long, Decimal::from(100), 60))
        .await
        .unwrap();
    store
        .save_signal(&valid_signal("BTCUSDT", Direction::Short, Decimal::from(100), 95))
        .await
        .unwrap();
    let exchange = ScriptedExchange::new();
    let t = trader(store.clone(), exchange.clone(), relaxed_config());

    let trade = t.run_iteration(Utc::now()).await.opened.unwrap();
    assert_eq!(trade.symbol, "BTCUSDT");
    assert_eq!(trade.side, Direction::Short);
    assert_eq!(trade.stop_loss, Decimal::from(102));
    assert_eq!(trade.take_profit, Decimal::from(96));
    assert_eq!(trade.order_status, OrderStatus::Submitted);
    assert!(trade.order_id.is_some());

    let orders = exchange.orders.lock().await;
    assert_eq!(orders.len(), 1);
    // 5 USDT margin at 5x on a 100 price
    assert_eq!(orders[0], ("BTCUSDT".to_string(), Direction::Short, Decimal::new(25, 2)));
}

#[tokio::test]
async fn test_take_profit_closes_long() {
    let store = memory_store();
    let signal = valid_signal("BTCUSDT", Direction::Long, Decimal::from(100), 90);
    store.save_signal(&signal).await.unwrap();
    let exchange = ScriptedExchange::new();
    let t = trader(store.clone(), exchange.clone(), relaxed_config());
    let now = Utc::now();

    let opened = t.run_iteration(now).await.opened.unwrap();
    assert_eq!(opened.take_profit, Decimal::from(104));

    exchange.set_price("BTCUSDT", Decimal::new(1045, 1)).await;
    let report = t.run_iteration(now + Duration::minutes(1)).await;
    assert!(report.opened.is_none());
    assert_eq!(report.closed.len(), 1);

    let close = report.closed[0].close.clone().unwrap();
    assert_eq!(close.reason, CloseReason::TakeProfit);
    // 4.5% of 5 USDT at 5x
    assert_eq!(close.pnl, Decimal::new(1125, 3));
    assert_eq!(close.commission, Decimal::new(5, 3));
    assert_eq!(close.net_pnl, Decimal::new(112, 2));

    let stored = store.query_trades(Some(TradeStatus::Closed), 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, opened.id);

    let stats = t.stats().await;
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.consecutive_losses, 0);
    assert_eq!(stats.total_pnl, Decimal::new(1125, 3));
    assert_eq!(stats.net_pnl, Decimal::new(112, 2));
    assert!(stats.open_positions.is_empty());

    // The signal is spent; nothing else to trade.
    let again = t.run_iteration(now + Duration::minutes(2)).await;
    assert!(again.opened.is_none());
}

#[tokio::test]
async fn test_rejected_order_keeps_trade_open() {
    let store = memory_store();
    store
        .save_signal(&valid_signal("SOLUSDT", Direction::Long, Decimal::from(20), 80))
        .await
        .unwrap();
    let exchange = ScriptedExchange::new();
    exchange.reject_orders(true).await;
    let t = trader(store.clone(), exchange.clone(), relaxed_config());

    let trade = t.run_iteration(Utc::now()).await.opened.unwrap();
    assert_eq!(trade.order_status, OrderStatus::Failed);
    assert!(trade.order_id.is_none());

    let open = store.query_open_trades().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].order_status, OrderStatus::Failed);
    assert_eq!(t.stats().await.open_positions.len(), 1);
}

#[tokio::test]
async fn test_loss_streak_stops_trader() {
    let store = memory_store();
    store
        .save_signal(&valid_signal("AUSDT", Direction::Long, Decimal::from(100), 90))
        .await
        .unwrap();
    store
        .save_signal(&valid_signal("BUSDT", Direction::Long, Decimal::from(100), 80))
        .await
        .unwrap();
    let exchange = ScriptedExchange::new();
    let cfg = EngineConfig {
        max_consecutive_losses: 1,
        ..relaxed_config()
    };
    let t = trader(store.clone(), exchange.clone(), cfg);
    let now = Utc::now();

    let opened = t.run_iteration(now).await.opened.unwrap();
    assert_eq!(opened.symbol, "AUSDT");

    exchange.set_price("AUSDT", Decimal::from(97)).await;
    let report = t.run_iteration(now + Duration::minutes(1)).await;
    // Selection happens before monitoring, so the second signal opens first.
    assert_eq!(report.opened.map(|t| t.symbol), Some("BUSDT".to_string()));
    assert_eq!(report.closed.len(), 1);
    assert_eq!(report.closed[0].close.as_ref().unwrap().reason, CloseReason::StopLoss);

    let blocked = t.run_iteration(now + Duration::minutes(2)).await;
    assert!(matches!(
        blocked.gate,
        Some(RiskViolation::ConsecutiveLosses { current: 1, max: 1 })
    ));
    assert!(!t.is_running().await);
}

#[tokio::test]
async fn test_open_position_cap() {
    let store = memory_store();
    for i in 0..3 {
        let s = valid_signal(&format!("P{i}USDT"), Direction::Long, Decimal::from(10), 90 - i);
        store.save_signal(&s).await.unwrap();
    }
    let cfg = EngineConfig {
        max_open_positions: 2,
        ..EngineConfig::default()
    };
    let t = trader(store.clone(), ScriptedExchange::new(), cfg);
    let now = Utc::now();

    assert!(t.run_iteration(now).await.opened.is_some());
    assert!(t.run_iteration(now).await.opened.is_some());
    let capped = t.run_iteration(now).await;
    assert!(matches!(
        capped.gate,
        Some(RiskViolation::TooManyPositions { current: 2, max: 2 })
    ));
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let store = memory_store();
    let exchange: Arc<dyn Exchange> = ScriptedExchange::new();
    let t = trader(store, exchange, EngineConfig::default());

    assert!(!t.is_running().await);
    assert!(t.start().await.unwrap());
    assert!(!t.start().await.unwrap());
    assert!(t.is_running().await);

    assert!(t.stop().await);
    assert!(!t.stop().await);
    assert!(!t.stats().await.running);
}

#[tokio::test]
async fn test_start_reloads_open_positions() {
    let store = memory_store();
    store
        .save_signal(&valid_signal("XUSDT", Direction::Long, Decimal::from(10), 90))
        .await
        .unwrap();
    let exchange = ScriptedExchange::new();

    let first = trader(store.clone(), exchange.clone(), relaxed_config());
    let opened = first.run_iteration(Utc::now()).await.opened.unwrap();

    // A fresh trader over the same store picks the position back up.
    let second = trader(store.clone(), exchange.clone(), relaxed_config());
    assert!(second.start().await.unwrap());
    let stats = second.stats().await;
    assert_eq!(stats.open_positions.len(), 1);
    assert_eq!(stats.open_positions[0].id, opened.id);
    second.stop().await;

    assert!(second.trade_queue(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_new_signal_selected_after_many_traded() {
    let store = memory_store();
    let cfg = EngineConfig {
        max_daily_trades: 1000,
        max_open_positions: 1000,
        ..EngineConfig::default()
    };
    let t = trader(store.clone(), ScriptedExchange::new(), cfg);
    let now = Utc::now();

    for i in 0..60 {
        let s = valid_signal(&format!("OLD{i}USDT"), Direction::Long, Decimal::from(10), 100);
        store.save_signal(&s).await.unwrap();
        assert!(t.run_iteration(now).await.opened.is_some());
    }

    let fresh = valid_signal("FRESHUSDT", Direction::Long, Decimal::from(10), 90);
    store.save_signal(&fresh).await.unwrap();

    let queue = t.trade_queue(10).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, fresh.id);

    let opened = t.run_iteration(now).await.opened.unwrap();
    assert_eq!(opened.signal_id, fresh.id);
}

#[tokio::test]
async fn test_control_loop_trades_until_stopped() {
    let store = memory_store();
    store
        .save_signal(&valid_signal("LOOPUSDT", Direction::Long, Decimal::from(10), 90))
        .await
        .unwrap();
    let exchange = ScriptedExchange::new();
    let t = trader(store.clone(), exchange.clone(), relaxed_config());

    assert!(t.start().await.unwrap());
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert_eq!(store.query_open_trades().await.unwrap().len(), 1);
    assert!(t.stats().await.loop_active);

    assert!(t.stop().await);
    // The loop sees the stop on its next tick.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!t.stats().await.loop_active);

    store
        .save_signal(&valid_signal("LATEUSDT", Direction::Long, Decimal::from(10), 95))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(store.query_open_trades().await.unwrap().len(), 1);
    assert_eq!(exchange.orders.lock().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_start_runs_one_loop() {
    let store = memory_store();
    let t = trader(store, ScriptedExchange::new(), EngineConfig::default());

    let (a, b) = tokio::join!(t.start(), t.start());
    let started = [a.unwrap(), b.unwrap()];
    assert_eq!(started.iter().filter(|s| **s).count(), 1);
    assert!(t.stats().await.running);
    t.stop().await;
}
