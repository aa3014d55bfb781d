//! Trade reporting
//!
//! [`TradeReporter`] is a [`TradeSink`] that writes one line per trade,
//! either human readable text or JSON lines.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

use matching_engine::{Trade, TradeSink};

use crate::error::FeedError;

/// Trade line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `Traded 4 X AT 100 (buy #0, sell #1, worker-0)`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Render one trade in `format`, without the trailing newline
pub fn format_trade(trade: &Trade, format: ReportFormat) -> Result<String, FeedError> {
    Ok(match format {
        ReportFormat::Text => format!(
            "Traded {} {} AT {} (buy #{}, sell #{}, {})",
            trade.quantity,
            trade.symbol,
            trade.price,
            trade.buy_sequence,
            trade.sell_sequence,
            trade.venue
        ),
        ReportFormat::Json => serde_json::to_string(trade)?,
    })
}

/// Writes trades as they arrive from any thread
pub struct TradeReporter<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
    format: ReportFormat,
    written: AtomicU64,
    failed: AtomicU64,
}

impl<W: Write + Send> TradeReporter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            format,
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Trades written successfully
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Trades that could not be written
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().into_inner().map_err(|err| err.into_error())
    }

    fn write_line(&self, writer: &mut BufWriter<W>, trade: &Trade) {
        let result = format_trade(trade, self.format)
            .and_then(|line| writeln!(writer, "{}", line).map_err(FeedError::from));
        match result {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                // Report the first failure only; a broken pipe fails every line.
                if self.failed.fetch_add(1, Ordering::Relaxed) == 0 {
                    error!(error = %err, "Failed to write trade");
                }
            }
        }
    }
}

impl TradeReporter<io::Stdout> {
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl TradeReporter<File> {
    /// Create (or truncate) `path` and report into it
    pub fn create(path: &Path, format: ReportFormat) -> Result<Self, FeedError> {
        let file = File::create(path).map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file, format))
    }
}

impl<W: Write + Send> TradeSink for TradeReporter<W> {
    fn on_trade(&self, trade: &Trade) {
        let mut writer = self.writer.lock();
        self.write_line(&mut writer, trade);
    }

    fn on_trades(&self, trades: &[Trade]) {
        let mut writer = self.writer.lock();
        for trade in trades {
            self.write_line(&mut writer, trade);
        }
    }
}
