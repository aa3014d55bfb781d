//! Feed error types

use std::path::PathBuf;
use thiserror::Error;

/// A single input record that cannot become an order
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("line {line}: expected `SIDE SYMBOL QUANTITY PRICE`, found {fields} field(s)")]
    FieldCount { line: usize, fields: usize },

    #[error("line {line}: unknown side '{side}'")]
    UnknownSide { line: usize, side: String },

    #[error("line {line}: quantity '{value}' is not an integer")]
    MalformedQuantity { line: usize, value: String },

    #[error("line {line}: price '{value}' is not a number")]
    MalformedPrice { line: usize, value: String },

    #[error("line {line}: quantity must be positive, got {quantity}")]
    NonPositiveQuantity { line: usize, quantity: i64 },

    #[error("line {line}: price must be positive and finite, got {price}")]
    InvalidPrice { line: usize, price: f64 },
}

impl ValidationError {
    /// 1-based line number of the rejected record
    pub fn line(&self) -> usize {
        match self {
            ValidationError::FieldCount { line, .. }
            | ValidationError::UnknownSide { line, .. }
            | ValidationError::MalformedQuantity { line, .. }
            | ValidationError::MalformedPrice { line, .. }
            | ValidationError::NonPositiveQuantity { line, .. }
            | ValidationError::InvalidPrice { line, .. } => *line,
        }
    }
}

/// Errors that stop a whole feed
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to open feed {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Strict ingestion stops at the first invalid record
    #[error("Rejected record: {0}")]
    Rejected(#[from] ValidationError),

    #[error("Invalid generator settings: {0}")]
    InvalidGenerator(String),

    #[error("Failed to encode trade: {0}")]
    Encode(#[from] serde_json::Error),
}
