//! Matching engine error types

use thiserror::Error;

use crate::engine::EngineState;

/// Errors that can occur during order matching
#[derive(Error, Debug)]
pub enum MatchingError {
    /// A book invariant was broken. Always fatal.
    #[error("Invariant violation in {context}: {detail}")]
    InvariantViolation {
        /// Component or book where the violation was observed
        context: String,
        /// What was broken
        detail: String,
    },

    /// The engine no longer accepts shards
    #[error("Engine is {state}, new shards are not accepted")]
    NotAccepting {
        /// Lifecycle state at the time of the call
        state: EngineState,
    },

    /// A worker or aggregator thread panicked
    #[error("Thread '{0}' panicked")]
    ThreadPanicked(String),

    /// A worker's shard queue was closed before the engine drained
    #[error("Worker {0} is no longer receiving shards")]
    WorkerGone(usize),

    /// Engine configuration cannot be used
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Spawning a thread failed
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl MatchingError {
    /// Build an invariant violation with context
    pub fn invariant(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            context: context.into(),
            detail: detail.into(),
        }
    }

    /// Whether the error reports a broken book invariant
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}
