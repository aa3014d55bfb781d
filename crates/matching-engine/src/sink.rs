//! Streaming trade output
//!
//! Workers and the aggregator hand every trade to a [`TradeSink`] as soon as
//! it is produced, outside of any book lock.

use parking_lot::Mutex;

use crate::domain::{Quantity, Trade};

/// Receives trades as they are executed. Called concurrently from every
/// worker thread and the aggregator thread.
pub trait TradeSink: Send + Sync {
    fn on_trade(&self, trade: &Trade);

    /// Deliver a batch, in order
    fn on_trades(&self, trades: &[Trade]) {
        for trade in trades {
            self.on_trade(trade);
        }
    }
}

impl<F> TradeSink for F
where
    F: Fn(&Trade) + Send + Sync,
{
    fn on_trade(&self, trade: &Trade) {
        self(trade)
    }
}

/// Discards every trade
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TradeSink for NullSink {
    fn on_trade(&self, _trade: &Trade) {}
}

/// Collects trades in memory, in arrival order
#[derive(Debug, Default)]
pub struct TradeLog {
    trades: Mutex<Vec<Trade>>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every trade received so far
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().clone()
    }

    /// Remove and return every trade received so far
    pub fn take(&self) -> Vec<Trade> {
        std::mem::take(&mut *self.trades.lock())
    }

    pub fn len(&self) -> usize {
        self.trades.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.lock().is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.trades.lock().iter().map(|t| t.quantity).sum()
    }
}

impl TradeSink for TradeLog {
    fn on_trade(&self, trade: &Trade) {
        self.trades.lock().push(trade.clone());
    }

    fn on_trades(&self, trades: &[Trade]) {
        self.trades.lock().extend_from_slice(trades);
    }
}
