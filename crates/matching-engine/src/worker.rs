//! Shard worker
//!
//! A worker matches its shards against a private [`LocalBook`] and
//! periodically moves whatever rests there into the [`GlobalBook`].

use serde::Serialize;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::{Order, Quantity, TradeVenue};
use crate::global::GlobalBook;
use crate::local::LocalBook;
use crate::metrics::MatchingMetrics;
use crate::sink::TradeSink;
use crate::Result;

/// Per-worker totals, summed by the engine at drain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    pub shards: usize,
    pub orders: u64,
    pub input_quantity: Quantity,
    pub trades: u64,
    pub traded_quantity: Quantity,
    pub merges: u64,
    pub merged_orders: u64,
}

/// Matches shards locally and merges into the global book
pub struct Worker {
    index: usize,
    merge_threshold: usize,
    local: LocalBook,
    global: Arc<GlobalBook>,
    sink: Arc<dyn TradeSink>,
    metrics: MatchingMetrics,
    report: WorkerReport,
}

impl Worker {
    /// `merge_threshold == 0` merges only when a shard is finished
    pub fn new(
        index: usize,
        merge_threshold: usize,
        global: Arc<GlobalBook>,
        sink: Arc<dyn TradeSink>,
    ) -> Self {
        let venue = TradeVenue::Worker(index);
        Self {
            index,
            merge_threshold,
            local: LocalBook::new(venue),
            global,
            sink,
            metrics: MatchingMetrics::new(venue),
            report: WorkerReport {
                worker: index,
                ..WorkerReport::default()
            },
        }
    }

    /// Consume shards until the sending side closes
    pub fn run(mut self, shards: Receiver<Vec<Order>>) -> Result<WorkerReport> {
        debug!(worker = self.index, "Worker started");
        for shard in shards {
            self.process_shard(shard)?;
        }
        info!(
            worker = self.index,
            shards = self.report.shards,
            orders = self.report.orders,
            trades = self.report.trades,
            merges = self.report.merges,
            "Worker finished"
        );
        Ok(self.report)
    }

    /// Match every order of `shard`, then perform the shard's final merge.
    pub fn process_shard(&mut self, shard: Vec<Order>) -> Result<()> {
        let len = shard.len();
        debug!(worker = self.index, orders = len, "Shard received");

        for (processed, order) in shard.into_iter().enumerate() {
            self.process_order(order)?;
            if self.merge_threshold > 0 && (processed + 1) % self.merge_threshold == 0 {
                self.merge()?;
            }
        }
        self.merge()?;

        self.report.shards += 1;
        debug!(worker = self.index, orders = len, "Shard complete");
        Ok(())
    }

    fn process_order(&mut self, order: Order) -> Result<()> {
        self.report.orders += 1;
        self.report.input_quantity += order.quantity;
        self.metrics.record_order();

        let trades = self.local.submit(order)?;
        if !trades.is_empty() {
            self.report.trades += trades.len() as u64;
            self.report.traded_quantity += trades.iter().map(|t| t.quantity).sum::<Quantity>();
            self.metrics.record_trades(&trades);
            self.sink.on_trades(&trades);
        }
        Ok(())
    }

    fn merge(&mut self) -> Result<()> {
        let started = Instant::now();
        let merged = self.global.merge(&mut self.local)?;
        if merged.moved > 0 {
            self.report.merges += 1;
            self.report.merged_orders += merged.moved as u64;
            self.metrics.record_merge(merged.moved, started.elapsed());
        }
        Ok(())
    }

    /// Resting state of the local book (empty between shards)
    pub fn local(&self) -> &LocalBook {
        &self.local
    }
}
