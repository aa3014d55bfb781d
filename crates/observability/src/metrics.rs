//! Prometheus metrics infrastructure
//!
//! The engine records through the `metrics` facade; this module installs the
//! exporter and registers descriptions for every engine metric.

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on `port` that serves the scrape endpoint.
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_engine_metrics();
    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Register help text and units for the matching engine's metrics
pub fn describe_engine_metrics() {
    describe_counter!(
        "crossbook_orders_processed_total",
        Unit::Count,
        "Orders matched by workers"
    );
    describe_counter!("crossbook_trades_total", Unit::Count, "Trades executed");
    describe_counter!(
        "crossbook_traded_quantity_total",
        Unit::Count,
        "Quantity executed across all trades"
    );
    describe_counter!(
        "crossbook_merges_total",
        Unit::Count,
        "Local books merged into the global book"
    );
    describe_counter!(
        "crossbook_merged_orders_total",
        Unit::Count,
        "Resting orders moved into the global book"
    );
    describe_histogram!(
        "crossbook_merge_duration_seconds",
        Unit::Seconds,
        "Time spent merging one local book"
    );
    describe_counter!(
        "crossbook_aggregator_passes_total",
        Unit::Count,
        "Aggregator reduction passes"
    );
    describe_gauge!(
        "crossbook_global_resting_orders",
        Unit::Count,
        "Orders resting in the global book after the last pass"
    );
}
