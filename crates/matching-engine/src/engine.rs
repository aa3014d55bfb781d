//! Sharded matching engine lifecycle
//!
//! [`ShardedEngine`] owns the worker pool, the aggregator thread and the
//! shared [`GlobalBook`]. It moves through three states:
//!
//! ```text
//! Running ──drain()──▶ Draining ──workers + aggregator joined──▶ Terminated
//! ```
//!
//! Shards are only accepted while `Running`. Sharding trades strict global
//! ordering for throughput: two crossing orders on different shards only
//! meet once both have been merged and the aggregator has run. Conservation
//! and price priority hold after a drain; output is not guaranteed to be
//! identical to a single-threaded run.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

use crate::aggregator::{Aggregator, AggregatorReport};
use crate::book::{BookSnapshot, BookTotals};
use crate::domain::{Order, Quantity, Trade};
use crate::error::MatchingError;
use crate::global::GlobalBook;
use crate::sink::TradeSink;
use crate::worker::{Worker, WorkerReport};
use crate::Result;

/// Default number of worker threads
pub const DEFAULT_WORKERS: usize = 4;

/// Default number of orders between periodic merges
pub const DEFAULT_MERGE_THRESHOLD: usize = 1024;

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker threads (at least one)
    pub workers: usize,
    /// Orders processed between merges; `0` merges only at shard end
    pub merge_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn new(workers: usize, merge_threshold: usize) -> Self {
        Self {
            workers,
            merge_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(MatchingError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Running,
    Draining,
    Terminated,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Running => write!(f, "running"),
            EngineState::Draining => write!(f, "draining"),
            EngineState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Totals gathered at drain
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineSummary {
    pub workers: Vec<WorkerReport>,
    pub aggregator: AggregatorReport,
    /// Orders left in the global book after the final pass
    pub resting: BookTotals,
}

impl EngineSummary {
    pub fn orders(&self) -> u64 {
        self.workers.iter().map(|w| w.orders).sum()
    }

    pub fn input_quantity(&self) -> Quantity {
        self.workers.iter().map(|w| w.input_quantity).sum()
    }

    pub fn trades(&self) -> u64 {
        self.workers.iter().map(|w| w.trades).sum::<u64>() + self.aggregator.trades
    }

    pub fn local_traded_quantity(&self) -> Quantity {
        self.workers.iter().map(|w| w.traded_quantity).sum()
    }

    pub fn traded_quantity(&self) -> Quantity {
        self.local_traded_quantity() + self.aggregator.traded_quantity
    }

    /// Every unit of input either traded (counted once per side) or rests
    pub fn is_conserved(&self) -> bool {
        self.input_quantity() == 2 * self.traded_quantity() + self.resting.quantity()
    }
}

/// Split `orders` into `shards` contiguous ranges of equal length, the last
/// shard also taking the remainder.
pub fn partition(orders: Vec<Order>, shards: usize) -> Vec<Vec<Order>> {
    let shards = shards.max(1);
    let base = orders.len() / shards;

    let mut remaining = orders.into_iter();
    let mut result: Vec<Vec<Order>> = (0..shards - 1)
        .map(|_| remaining.by_ref().take(base).collect())
        .collect();
    result.push(remaining.collect());
    result
}

/// Worker pool + aggregator around one shared global book
pub struct ShardedEngine {
    config: EngineConfig,
    state: EngineState,
    global: Arc<GlobalBook>,
    senders: Vec<Sender<Vec<Order>>>,
    workers: Vec<JoinHandle<Result<WorkerReport>>>,
    aggregator: Option<JoinHandle<Result<AggregatorReport>>>,
    next_worker: usize,
    summary: Option<EngineSummary>,
}

impl ShardedEngine {
    /// Spawn the aggregator and every worker, ready to receive shards.
    pub fn start(config: EngineConfig, sink: Arc<dyn TradeSink>) -> Result<Self> {
        config.validate()?;
        let global = Arc::new(GlobalBook::new());

        let aggregator = {
            let aggregator = Aggregator::new(Arc::clone(&global), Arc::clone(&sink));
            thread::Builder::new()
                .name("crossbook-aggregator".to_string())
                .spawn(move || aggregator.run())?
        };

        let mut engine = Self {
            config,
            state: EngineState::Running,
            global,
            senders: Vec::with_capacity(config.workers),
            workers: Vec::with_capacity(config.workers),
            aggregator: Some(aggregator),
            next_worker: 0,
            summary: None,
        };

        for index in 0..config.workers {
            let (tx, rx) = mpsc::channel();
            let worker = Worker::new(
                index,
                config.merge_threshold,
                Arc::clone(&engine.global),
                Arc::clone(&sink),
            );
            let handle = thread::Builder::new()
                .name(format!("crossbook-worker-{}", index))
                .spawn(move || worker.run(rx))?;
            engine.senders.push(tx);
            engine.workers.push(handle);
        }

        info!(
            workers = config.workers,
            merge_threshold = config.merge_threshold,
            "Sharded engine started"
        );
        Ok(engine)
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Hand a shard to the next worker (round-robin).
    ///
    /// Returns the index of the worker that received it. If that worker has
    /// already failed, the engine is drained and the failure is returned.
    pub fn submit(&mut self, shard: Vec<Order>) -> Result<usize> {
        if self.state != EngineState::Running {
            return Err(MatchingError::NotAccepting { state: self.state });
        }

        let index = self.next_worker % self.senders.len();
        self.next_worker += 1;
        if self.senders[index].send(shard).is_err() {
            // A worker only hangs up by failing; its own error says why.
            warn!(worker = index, "Worker hung up, draining");
            return Err(self.drain().err().unwrap_or(MatchingError::WorkerGone(index)));
        }
        Ok(index)
    }

    /// Stop accepting shards, wait for every worker's final merge, run the
    /// aggregator's final pass and shut it down.
    ///
    /// Returns the trades of that final pass. Calling it again returns an
    /// empty list.
    pub fn drain(&mut self) -> Result<Vec<Trade>> {
        if self.state != EngineState::Running {
            return Ok(Vec::new());
        }
        self.state = EngineState::Draining;
        info!("Draining sharded engine");

        // Closing the channels ends each worker after its last shard.
        self.senders.clear();

        let mut failure: Option<MatchingError> = None;
        let mut reports = Vec::with_capacity(self.workers.len());
        for (index, handle) in self.workers.drain(..).enumerate() {
            match join(handle, &format!("crossbook-worker-{}", index)) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(worker = index, error = %err, "Worker failed");
                    failure.get_or_insert(err);
                }
            }
        }

        self.global.terminate();
        let aggregator = match self.aggregator.take() {
            Some(handle) => join(handle, "crossbook-aggregator"),
            None => Ok(AggregatorReport::default()),
        };
        self.state = EngineState::Terminated;

        let mut aggregator = match aggregator {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "Aggregator failed");
                return Err(failure.unwrap_or(err));
            }
        };
        if let Some(err) = failure {
            return Err(err);
        }

        let final_pass = std::mem::take(&mut aggregator.final_pass);
        let summary = EngineSummary {
            workers: reports,
            aggregator,
            resting: self.resting(),
        };
        info!(
            orders = summary.orders(),
            trades = summary.trades(),
            traded_quantity = summary.traded_quantity(),
            resting_orders = summary.resting.orders(),
            "Sharded engine terminated"
        );
        self.summary = Some(summary);
        Ok(final_pass)
    }

    /// Totals, available once the engine has terminated
    pub fn summary(&self) -> Option<&EngineSummary> {
        self.summary.as_ref()
    }

    /// Orders currently resting in the global book
    pub fn resting(&self) -> BookTotals {
        self.global.lock().totals()
    }

    /// Depth snapshot of one symbol in the global book
    pub fn snapshot(&self, symbol: &str, depth: usize) -> Option<BookSnapshot> {
        self.global.lock().snapshot(symbol, depth)
    }
}

impl Drop for ShardedEngine {
    fn drop(&mut self) {
        if self.state == EngineState::Running {
            warn!("Sharded engine dropped without drain");
            if let Err(err) = self.drain() {
                error!(error = %err, "Drain on drop failed");
            }
        }
    }
}

fn join<T>(handle: JoinHandle<Result<T>>, name: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| MatchingError::ThreadPanicked(name.to_string()))?
}

/// Partition `orders` across `config.workers` shards, run them through a
/// fresh engine and drain it.
pub fn run_sharded(
    config: EngineConfig,
    orders: Vec<Order>,
    sink: Arc<dyn TradeSink>,
) -> Result<EngineSummary> {
    let mut engine = ShardedEngine::start(config, sink)?;
    for shard in partition(orders, config.workers) {
        engine.submit(shard)?;
    }
    engine.drain()?;
    engine
        .summary
        .take()
        .ok_or_else(|| MatchingError::invariant("engine", "no summary after drain"))
}
