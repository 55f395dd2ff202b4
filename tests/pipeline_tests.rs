mod common;

use chrono::Utc;
use rust_decimal::Decimal;

use whale_hunter::config::EngineConfig;
use whale_hunter::ingestion::Pipeline;
use whale_hunter::intelligence::{score_signal, PriceTracker};
use whale_hunter::models::{Direction, PumpDumpKind, SignalStatus, Trend, WhaleSide};

use common::{memory_store, minutes_after, shared_engine, snapshot};

fn pipeline(store: whale_hunter::db::DynStore) -> Pipeline {
    Pipeline::new(store, PriceTracker::new(), shared_engine(EngineConfig::default()))
}

#[tokio::test]
async fn test_whale_creates_event_and_pending_signal() {
    let store = memory_store();
    let p = pipeline(store.clone());

    let batch = vec![
        snapshot("BTCUSDT", Decimal::from(100), 600_000, Decimal::from(6)),
        snapshot("ETHUSDT", Decimal::from(50), 10_000, Decimal::ONE),
    ];
    let outcome = p.process_batch_at(&batch, Utc::now()).await.unwrap();
    assert_eq!(outcome.whales, 1);
    assert_eq!(outcome.signals_created, 1);
    assert_eq!(outcome.pump_dumps, 0);

    let whales = store.query_whale_events(10).await.unwrap();
    assert_eq!(whales.len(), 1);
    assert_eq!(whales[0].side, WhaleSide::Buy);
    assert_eq!(whales[0].confidence, Decimal::from(90));

    let pending = store.query_pending_signals().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].direction, Direction::Long);
    assert_eq!(pending[0].trend, Trend::Bullish);
    assert_eq!(pending[0].whale_event_id, whales[0].id);
    assert_eq!(pending[0].score, 0);
}

#[tokio::test]
async fn test_signal_walks_through_three_stages() {
    let store = memory_store();
    let p = pipeline(store.clone());
    let t0 = Utc::now();

    p.process_batch_at(
        &[snapshot("BTCUSDT", Decimal::from(100), 600_000, Decimal::from(6))],
        t0,
    )
    .await
    .unwrap();

    // Later batches stay under the whale threshold so no new signals appear.
    let quiet = |price: Decimal| vec![snapshot("BTCUSDT", price, 1_000, Decimal::ZERO)];

    let o1 = p.process_batch_at(&quiet(Decimal::from(101)), minutes_after(t0, 1)).await.unwrap();
    assert_eq!(o1.signals_staged, 1);
    let o2 = p.process_batch_at(&quiet(Decimal::from(101)), minutes_after(t0, 2)).await.unwrap();
    assert_eq!(o2.signals_staged, 1);
    let o3 = p
        .process_batch_at(&quiet(Decimal::new(10005, 2)), minutes_after(t0, 4))
        .await
        .unwrap();
    assert_eq!(o3.signals_finalized, 1);

    assert!(store.query_pending_signals().await.unwrap().is_empty());
    let valid = store.query_valid_signals(0, 10).await.unwrap();
    assert_eq!(valid.len(), 1);
    let s = &valid[0];
    assert!(s.stage_passed(0));
    assert!(s.stage_passed(1));
    assert!(!s.stage_passed(2));
    // 20 + 30 + trend + flow
    assert_eq!(s.score, 70);
    assert!(s.validated_at.is_some());
}

#[tokio::test]
async fn test_pump_needs_prior_observation() {
    let store = memory_store();
    let p = pipeline(store.clone());
    let t0 = Utc::now();

    let first = p
        .process_batch_at(&[snapshot("SOLUSDT", Decimal::from(100), 10, Decimal::ZERO)], t0)
        .await
        .unwrap();
    assert_eq!(first.pump_dumps, 0);

    let second = p
        .process_batch_at(
            &[snapshot("SOLUSDT", Decimal::from(96), 10, Decimal::ZERO)],
            minutes_after(t0, 1),
        )
        .await
        .unwrap();
    assert_eq!(second.pump_dumps, 1);

    let events = store.query_pump_dumps(10).await.unwrap();
    assert_eq!(events[0].kind, PumpDumpKind::Dump);
    assert_eq!(events[0].prev_price, Decimal::from(100));
    assert_eq!(events[0].change_pct, Decimal::from(-4));
}

#[tokio::test]
async fn test_price_map_has_latest_price_per_symbol() {
    let store = memory_store();
    let p = pipeline(store);

    let batches = [
        vec![
            snapshot("A", Decimal::from(10), 1, Decimal::ZERO),
            snapshot("B", Decimal::from(20), 1, Decimal::ZERO),
        ],
        vec![snapshot("A", Decimal::from(11), 1, Decimal::ZERO)],
        vec![
            snapshot("C", Decimal::from(30), 1, Decimal::ZERO),
            snapshot("B", Decimal::from(19), 1, Decimal::ZERO),
        ],
    ];
    for batch in &batches {
        p.process_batch(batch).await.unwrap();
    }

    let map = p.tracker().snapshot().await;
    assert_eq!(map.len(), 3);
    assert_eq!(map["A"], Decimal::from(11));
    assert_eq!(map["B"], Decimal::from(19));
    assert_eq!(map["C"], Decimal::from(30));
}

#[tokio::test]
async fn test_signal_for_vanished_symbol_expires() {
    let store = memory_store();
    let p = pipeline(store.clone());
    let t0 = Utc::now();

    p.process_batch_at(
        &[snapshot("RUGUSDT", Decimal::from(2), 900_000, Decimal::from(-8))],
        t0,
    )
    .await
    .unwrap();

    let other = vec![snapshot("BTCUSDT", Decimal::from(100), 1, Decimal::ZERO)];
    let o = p.process_batch_at(&other, minutes_after(t0, 10)).await.unwrap();
    assert_eq!(o.signals_expired, 0);
    assert_eq!(store.query_pending_signals().await.unwrap().len(), 1);

    let o = p.process_batch_at(&other, minutes_after(t0, 31)).await.unwrap();
    assert_eq!(o.signals_expired, 1);

    let invalid = store
        .query_signals(Some(SignalStatus::Invalid), 10)
        .await
        .unwrap();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].score, 0);
    assert_eq!(invalid[0].direction, Direction::Short);
}

#[tokio::test]
async fn test_replayed_signal_update_is_idempotent() {
    let store = memory_store();
    let p = pipeline(store.clone());
    let t0 = Utc::now();

    p.process_batch_at(
        &[snapshot("BTCUSDT", Decimal::from(100), 600_000, Decimal::from(6))],
        t0,
    )
    .await
    .unwrap();
    p.process_batch_at(
        &[snapshot("BTCUSDT", Decimal::from(101), 1, Decimal::ZERO)],
        minutes_after(t0, 5),
    )
    .await
    .unwrap();

    let once = store.query_signals(None, 10).await.unwrap();
    store.update_signal(&once[0]).await.unwrap();
    store.update_signal(&once[0]).await.unwrap();
    let twice = store.query_signals(None, 10).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice[0].status, SignalStatus::Valid);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_validation_passes_stay_consistent() {
    let cfg = EngineConfig::default();

    for _ in 0..20 {
        let store = memory_store();
        let p = pipeline(store.clone());
        let t0 = Utc::now();
        p.process_batch_at(
            &[snapshot("BTCUSDT", Decimal::from(100), 600_000, Decimal::from(6))],
            t0,
        )
        .await
        .unwrap();

        // One pass confirms stages 1 and 2, the other would fail all three.
        let early = {
            let p = p.clone();
            tokio::spawn(async move {
                let batch = vec![snapshot("BTCUSDT", Decimal::from(101), 1, Decimal::ZERO)];
                p.process_batch_at(&batch, minutes_after(t0, 2)).await
            })
        };
        let late = {
            let p = p.clone();
            tokio::spawn(async move {
                let batch = vec![snapshot("BTCUSDT", Decimal::from(99), 1, Decimal::ZERO)];
                p.process_batch_at(&batch, minutes_after(t0, 4)).await
            })
        };
        let (a, b) = tokio::join!(early, late);
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let stored = store.query_signals(None, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        let s = &stored[0];
        assert!(!s.is_pending());
        assert!(s.stages.iter().all(Option::is_some));
        let expected = if s.passed_stages() >= 2 {
            SignalStatus::Valid
        } else {
            SignalStatus::Invalid
        };
        assert_eq!(s.status, expected);
        assert_eq!(s.score, score_signal(s, &cfg.validation_weights));
    }
}
