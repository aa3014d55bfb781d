//! Worker-local order book
//!
//! A [`LocalBook`] is owned by exactly one worker thread and needs no
//! synchronization. Fed the whole order stream it is also the
//! single-threaded reference book.

use crate::book::{BookPair, BookSet, BookTotals};
use crate::domain::{Order, Trade, TradeVenue};
use crate::matcher::match_order;
use crate::Result;

/// Per-worker book: one [`BookPair`] per symbol
#[derive(Debug)]
pub struct LocalBook {
    books: BookSet,
    venue: TradeVenue,
}

impl LocalBook {
    /// Create an empty book whose trades are tagged with `venue`
    pub fn new(venue: TradeVenue) -> Self {
        Self {
            books: BookSet::new(),
            venue,
        }
    }

    /// Match `order` against local resting orders, then rest the remainder.
    pub fn submit(&mut self, order: Order) -> Result<Vec<Trade>> {
        let pair = self.books.pair_mut(&order.symbol);
        let (same_side, counter_side) = pair.sides_mut(order.side);

        let result = match_order(order, counter_side, self.venue);
        if let Some(remaining) = result.remaining {
            same_side.insert(remaining)?;
        }
        Ok(result.trades)
    }

    /// Hand every resting order over, leaving the book empty
    pub fn take(&mut self) -> BookSet {
        std::mem::take(&mut self.books)
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn totals(&self) -> BookTotals {
        self.books.totals()
    }

    pub fn pair(&self, symbol: &str) -> Option<&BookPair> {
        self.books.pair(symbol)
    }

    pub fn verify(&self) -> Result<()> {
        self.books.verify()
    }
}
