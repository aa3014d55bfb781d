//! Global aggregator loop
//!
//! The only component that can match orders coming from different shards.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{Quantity, Trade, TradeVenue};
use crate::global::GlobalBook;
use crate::metrics::MatchingMetrics;
use crate::sink::TradeSink;
use crate::Result;

/// Aggregator totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatorReport {
    pub passes: u64,
    pub trades: u64,
    pub traded_quantity: Quantity,
    /// Trades produced by the final pass after termination
    #[serde(skip)]
    pub final_pass: Vec<Trade>,
}

/// Re-matches the global book whenever a merge publishes new resting orders
pub struct Aggregator {
    global: Arc<GlobalBook>,
    sink: Arc<dyn TradeSink>,
    metrics: MatchingMetrics,
    report: AggregatorReport,
}

impl Aggregator {
    pub fn new(global: Arc<GlobalBook>, sink: Arc<dyn TradeSink>) -> Self {
        Self {
            global,
            sink,
            metrics: MatchingMetrics::new(TradeVenue::Aggregator),
            report: AggregatorReport::default(),
        }
    }

    /// Loop until termination, then run one full pass and exit.
    pub fn run(mut self) -> Result<AggregatorReport> {
        debug!("Aggregator started");
        loop {
            let (trades, resting, terminating) = {
                let (mut section, terminating) = self.global.wait_for_work();
                let trades = if terminating {
                    let trades = section.reduce_all()?;
                    section.verify()?;
                    trades
                } else {
                    section.reduce_dirty()?
                };
                (trades, section.totals().orders(), terminating)
            };

            self.publish(&trades, resting);
            if terminating {
                info!(
                    passes = self.report.passes,
                    trades = self.report.trades,
                    final_trades = trades.len(),
                    resting,
                    "Aggregator drained"
                );
                self.report.final_pass = trades;
                return Ok(self.report);
            }
        }
    }

    fn publish(&mut self, trades: &[Trade], resting: usize) {
        self.report.passes += 1;
        self.report.trades += trades.len() as u64;
        self.report.traded_quantity += trades.iter().map(|t| t.quantity).sum::<Quantity>();
        self.metrics.record_pass(resting);
        self.metrics.record_trades(trades);
        if !trades.is_empty() {
            debug!(trades = trades.len(), resting, "Aggregator pass");
            self.sink.on_trades(trades);
        }
    }
}
