//! Feed ingestion
//!
//! Turns validated records into [`Order`]s, assigning arrival sequence
//! numbers in feed order. Rejected records never consume a sequence number.

use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, instrument, warn};

use matching_engine::Order;

use crate::error::{FeedError, ValidationError};
use crate::parser::FeedReader;

/// How to treat invalid records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectPolicy {
    /// Log, count and continue with the rest of the feed
    #[default]
    Skip,
    /// Stop at the first invalid record
    Fail,
}

/// One rejected record
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub line: usize,
    pub reason: String,
}

/// Outcome of ingesting a feed
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Non-blank, non-comment lines seen
    pub records: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

impl IngestReport {
    fn reject(&mut self, err: &ValidationError) {
        warn!(line = err.line(), error = %err, "Rejected feed record");
        self.rejected += 1;
        self.rejections.push(Rejection {
            line: err.line(),
            reason: err.to_string(),
        });
    }
}

/// Read every record of `reader`, returning accepted orders with sequences
/// starting at `first_sequence`.
pub fn ingest<R: BufRead>(
    reader: R,
    first_sequence: u64,
    policy: RejectPolicy,
) -> Result<(Vec<Order>, IngestReport), FeedError> {
    let mut orders = Vec::new();
    let mut report = IngestReport::default();
    let mut sequence = first_sequence;

    for item in FeedReader::new(reader) {
        report.records += 1;
        match item? {
            Ok(record) => {
                orders.push(Order::new(
                    record.side,
                    record.symbol,
                    record.price,
                    record.quantity,
                    sequence,
                ));
                sequence += 1;
                report.accepted += 1;
            }
            Err(err) => {
                report.reject(&err);
                if policy == RejectPolicy::Fail {
                    return Err(FeedError::Rejected(err));
                }
            }
        }
    }

    Ok((orders, report))
}

/// Ingest a feed file from disk
#[instrument(skip(policy))]
pub fn ingest_file(path: &Path, policy: RejectPolicy) -> Result<(Vec<Order>, IngestReport), FeedError> {
    let file = File::open(path).map_err(|source| FeedError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let (orders, report) = ingest(BufReader::new(file), 0, policy)?;
    info!(
        path = %path.display(),
        accepted = report.accepted,
        rejected = report.rejected,
        "Feed ingested"
    );
    Ok((orders, report))
}
