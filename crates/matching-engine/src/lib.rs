//! Sharded price-time matching engine
//!
//! Orders are partitioned into shards and matched by a pool of worker
//! threads, each against its own [`LocalBook`]. Workers periodically merge
//! their resting orders into a shared [`GlobalBook`], where a single
//! aggregator thread matches orders that arrived on different shards.
//!
//! # Matching rules
//!
//! - Price-time priority: best price first, then lowest sequence
//! - Trades execute at the resting order's price
//! - Partial fills leave the remainder resting at its original priority
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use matching_engine::{EngineConfig, Order, ShardedEngine, TradeLog};
//!
//! let log = Arc::new(TradeLog::new());
//! let mut engine = ShardedEngine::start(EngineConfig::new(2, 0), log.clone()).unwrap();
//! engine.submit(vec![Order::buy("X", 100.0, 5, 0)]).unwrap();
//! engine.submit(vec![Order::sell("X", 99.0, 5, 1)]).unwrap();
//! engine.drain().unwrap();
//!
//! assert_eq!(log.total_quantity(), 5);
//! ```

pub mod aggregator;
pub mod book;
pub mod domain;
pub mod engine;
pub mod error;
pub mod global;
pub mod local;
pub mod matcher;
pub mod metrics;
pub mod result;
pub mod sink;
pub mod worker;

pub use aggregator::{Aggregator, AggregatorReport};
pub use book::{BookPair, BookSet, BookSide, BookSnapshot, BookTotals, PriceLevel};
pub use domain::{Order, Price, Quantity, Side, Symbol, Trade, TradeVenue};
pub use engine::{partition, run_sharded, EngineConfig, EngineState, EngineSummary, ShardedEngine};
pub use error::MatchingError;
pub use global::{GlobalBook, GlobalSection, MergeReport};
pub use local::LocalBook;
pub use matcher::{match_order, reduce_crossed};
pub use result::MatchResult;
pub use sink::{NullSink, TradeLog, TradeSink};
pub use worker::{Worker, WorkerReport};

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
