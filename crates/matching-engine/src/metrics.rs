//! Metrics for the Matching Engine
//!
//! Handles registered through the `metrics` facade. Without an installed
//! recorder every call is a no-op, so tests and embedders pay nothing.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use std::time::Duration;

use crate::domain::{Trade, TradeVenue};

/// Metric handles for one engine component (a worker or the aggregator)
#[derive(Clone)]
pub struct MatchingMetrics {
    orders_processed: Counter,
    trades: Counter,
    traded_quantity: Counter,
    merges: Counter,
    merged_orders: Counter,
    merge_duration: Histogram,
    aggregator_passes: Counter,
    global_resting_orders: Gauge,
}

impl MatchingMetrics {
    /// Handles labelled with the component that produces the trades
    pub fn new(venue: TradeVenue) -> Self {
        let component = venue.to_string();
        Self {
            orders_processed: counter!("crossbook_orders_processed_total", "component" => component.clone()),
            trades: counter!("crossbook_trades_total", "component" => component.clone()),
            traded_quantity: counter!("crossbook_traded_quantity_total", "component" => component.clone()),
            merges: counter!("crossbook_merges_total", "component" => component.clone()),
            merged_orders: counter!("crossbook_merged_orders_total", "component" => component.clone()),
            merge_duration: histogram!("crossbook_merge_duration_seconds", "component" => component),
            aggregator_passes: counter!("crossbook_aggregator_passes_total"),
            global_resting_orders: gauge!("crossbook_global_resting_orders"),
        }
    }

    pub fn record_order(&self) {
        self.orders_processed.increment(1);
    }

    pub fn record_trades(&self, trades: &[Trade]) {
        if trades.is_empty() {
            return;
        }
        self.trades.increment(trades.len() as u64);
        self.traded_quantity
            .increment(trades.iter().map(|t| t.quantity).sum());
    }

    pub fn record_merge(&self, moved: usize, elapsed: Duration) {
        self.merges.increment(1);
        self.merged_orders.increment(moved as u64);
        self.merge_duration.record(elapsed.as_secs_f64());
    }

    pub fn record_pass(&self, resting_orders: usize) {
        self.aggregator_passes.increment(1);
        self.global_resting_orders.set(resting_orders as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder() {
        // No recorder installed: just verify it doesn't panic
        let metrics = MatchingMetrics::new(TradeVenue::Worker(3));
        metrics.record_order();
        metrics.record_trades(&[Trade::new("X".into(), 2, 1.0, 1, 2, TradeVenue::Worker(3))]);
        metrics.record_merge(4, Duration::from_micros(5));
        metrics.record_pass(0);
    }
}
