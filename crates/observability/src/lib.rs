//! Observability setup for crossbook
//!
//! - Structured logging via tracing
//! - Prometheus exporter for the engine's `metrics` counters
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("crossbook", LogFormat::Pretty, "info")?;
//!
//! // Optional scrape endpoint
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{describe_engine_metrics, init_metrics};
