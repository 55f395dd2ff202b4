use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::models::{CloseReason, SignalStatus};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    register_metrics();
    Ok(handle)
}

/// Pre-register series so they show up in a scrape before the first event.
fn register_metrics() {
    counter!("whale_events_total").absolute(0);
    counter!("pump_dump_events_total").absolute(0);
    counter!("signals_created_total").absolute(0);
    counter!("signals_expired_total").absolute(0);
    for status in [SignalStatus::Valid, SignalStatus::Invalid] {
        counter!("signals_finalized_total", "status" => status.as_str()).absolute(0);
    }
    counter!("trades_opened_total").absolute(0);
    for reason in [CloseReason::StopLoss, CloseReason::TakeProfit] {
        counter!("trades_closed_total", "reason" => reason.as_str()).absolute(0);
    }
    counter!("orders_failed_total").absolute(0);
    counter!("market_fetch_failures_total").absolute(0);

    gauge!("open_positions").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("pipeline_latency_seconds").record(0.0);
}
