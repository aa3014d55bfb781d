//! Shared global book and merge protocol
//!
//! The [`GlobalBook`] is the only state shared between threads. Every read
//! or write goes through a [`GlobalSection`], a scoped guard over a single
//! mutex covering both sides of every symbol, so a merge is never partially
//! visible. The book also owns the work-available signal the aggregator
//! sleeps on.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

use crate::book::{BookPair, BookSet, BookSnapshot, BookTotals};
use crate::domain::{Symbol, Trade, TradeVenue};
use crate::local::LocalBook;
use crate::matcher::reduce_crossed;
use crate::Result;

#[derive(Debug, Default)]
struct GlobalState {
    books: BookSet,
    /// Symbols that received orders since the last reduction pass
    dirty: BTreeSet<Symbol>,
    /// Set by merges, cleared when the aggregator picks the work up
    pending: bool,
}

/// Outcome of moving one local book into the global book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Orders moved
    pub moved: usize,
    /// Symbols that received orders
    pub symbols: usize,
}

/// Book shared by the workers (during merges) and the aggregator
#[derive(Debug, Default)]
pub struct GlobalBook {
    state: Mutex<GlobalState>,
    work: Condvar,
    terminated: AtomicBool,
}

impl GlobalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the exclusive section
    pub fn lock(&self) -> GlobalSection<'_> {
        GlobalSection {
            guard: self.state.lock(),
        }
    }

    /// Move every resting order of `local` into the global book and wake
    /// the aggregator.
    ///
    /// This is a pure move: no matching happens here, and `local` is empty
    /// afterwards. An empty local book takes no lock and sends no signal.
    pub fn merge(&self, local: &mut LocalBook) -> Result<MergeReport> {
        if local.is_empty() {
            return Ok(MergeReport::default());
        }

        let mut incoming = local.take();
        let report = {
            let mut section = self.lock();
            let report = section.absorb(&mut incoming)?;
            section.guard.pending = true;
            report
        };
        self.work.notify_one();
        Ok(report)
    }

    /// Block until a merge has published new state or termination was
    /// requested.
    ///
    /// Returns the section still held, and whether this is the final pass.
    /// The pending flag is consumed.
    pub fn wait_for_work(&self) -> (GlobalSection<'_>, bool) {
        let mut guard = self.state.lock();
        while !guard.pending && !self.terminated.load(Ordering::Acquire) {
            self.work.wait(&mut guard);
        }
        guard.pending = false;
        let terminating = self.terminated.load(Ordering::Acquire);
        (GlobalSection { guard }, terminating)
    }

    /// Ask the aggregator to run its final pass and exit.
    ///
    /// The flag is written while holding the section so a concurrent
    /// `wait_for_work` either sees it before sleeping or gets the wakeup.
    pub fn terminate(&self) {
        {
            let _section = self.state.lock();
            self.terminated.store(true, Ordering::Release);
        }
        self.work.notify_all();
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

/// Exclusive access to the global book.
///
/// Holding a section blocks merges and the aggregator; keep it short and do
/// not call trade sinks while holding it.
pub struct GlobalSection<'a> {
    guard: MutexGuard<'a, GlobalState>,
}

impl GlobalSection<'_> {
    /// Move every order out of `books`, keeping original sequences.
    pub fn absorb(&mut self, books: &mut BookSet) -> Result<MergeReport> {
        let started = Instant::now();
        let (touched, moved) = self.guard.books.absorb(books)?;
        let report = MergeReport {
            moved,
            symbols: touched.len(),
        };
        self.guard.dirty.extend(touched);
        debug!(
            moved,
            symbols = report.symbols,
            elapsed_us = started.elapsed().as_micros() as u64,
            "Merged local book"
        );
        Ok(report)
    }

    /// Reduce every cross on symbols touched since the previous pass.
    pub fn reduce_dirty(&mut self) -> Result<Vec<Trade>> {
        let dirty = std::mem::take(&mut self.guard.dirty);
        let mut trades = Vec::new();
        for symbol in dirty {
            let pair = self.guard.books.pair_mut(&symbol);
            trades.extend(reduce_crossed(pair, TradeVenue::Aggregator));
            pair.verify_settled()?;
        }
        self.guard.books.prune();
        Ok(trades)
    }

    /// Reduce every cross on every symbol and verify the whole book.
    pub fn reduce_all(&mut self) -> Result<Vec<Trade>> {
        self.guard.dirty.clear();
        let mut trades = Vec::new();
        for pair in self.guard.books.pairs_mut() {
            trades.extend(reduce_crossed(pair, TradeVenue::Aggregator));
            pair.verify_settled()?;
        }
        self.guard.books.prune();
        Ok(trades)
    }

    pub fn is_empty(&self) -> bool {
        self.guard.books.is_empty()
    }

    pub fn totals(&self) -> BookTotals {
        self.guard.books.totals()
    }

    pub fn pair(&self, symbol: &str) -> Option<&BookPair> {
        self.guard.books.pair(symbol)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.guard.books.symbols()
    }

    pub fn snapshot(&self, symbol: &str, depth: usize) -> Option<BookSnapshot> {
        self.pair(symbol)
            .map(|pair| BookSnapshot::from_pair(pair, depth))
    }

    pub fn verify(&self) -> Result<()> {
        self.guard.books.verify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Order;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn local_with(orders: Vec<Order>) -> LocalBook {
        let mut book = LocalBook::new(TradeVenue::Worker(0));
        for order in orders {
            book.submit(order).unwrap();
        }
        book
    }

    #[test]
    fn test_merge_moves_without_matching() {
        let global = GlobalBook::new();
        let mut first = local_with(vec![Order::buy("X", 100.0, 3, 0)]);
        let mut second = local_with(vec![Order::sell("X", 100.0, 3, 1)]);

        assert_eq!(global.merge(&mut first).unwrap().moved, 1);
        assert_eq!(global.merge(&mut second).unwrap().moved, 1);
        assert!(first.is_empty());
        assert!(second.is_empty());

        let section = global.lock();
        let pair = section.pair("X").unwrap();
        assert!(pair.is_crossed());
        assert_eq!(section.totals().quantity(), 6);
    }

    #[test]
    fn test_empty_merge_is_silent() {
        let global = GlobalBook::new();
        let mut empty = LocalBook::new(TradeVenue::Worker(1));
        assert_eq!(global.merge(&mut empty).unwrap(), MergeReport::default());
    }

    #[test]
    fn test_reduce_dirty_matches_cross_shard_orders() {
        let global = GlobalBook::new();
        global
            .merge(&mut local_with(vec![Order::buy("X", 100.0, 3, 0)]))
            .unwrap();
        global
            .merge(&mut local_with(vec![Order::sell("X", 100.0, 3, 1)]))
            .unwrap();

        let (mut section, terminating) = global.wait_for_work();
        assert!(!terminating);
        let trades = section.reduce_dirty().unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 3);
        assert_eq!(trades[0].price, 100.0);
        assert_eq!(trades[0].venue, TradeVenue::Aggregator);
        assert!(section.is_empty());
        assert!(section.reduce_dirty().unwrap().is_empty());
    }

    #[test]
    fn test_merge_preserves_arrival_order_across_workers() {
        let global = GlobalBook::new();
        global
            .merge(&mut local_with(vec![Order::buy("X", 100.0, 1, 5)]))
            .unwrap();
        global
            .merge(&mut local_with(vec![Order::buy("X", 100.0, 1, 2)]))
            .unwrap();

        let section = global.lock();
        let order: Vec<u64> = section
            .pair("X")
            .unwrap()
            .buys()
            .iter()
            .map(|o| o.sequence)
            .collect();
        assert_eq!(order, vec![2, 5]);
        section.verify().unwrap();
    }

    #[test]
    fn test_reduce_fills_oldest_merged_order_first() {
        let global = GlobalBook::new();
        global
            .merge(&mut local_with(vec![Order::sell("X", 100.0, 2, 7)]))
            .unwrap();
        global
            .merge(&mut local_with(vec![Order::sell("X", 100.0, 2, 3)]))
            .unwrap();
        global
            .merge(&mut local_with(vec![Order::buy("X", 100.0, 3, 9)]))
            .unwrap();

        let (mut section, _) = global.wait_for_work();
        let fills: Vec<(u64, u64)> = section
            .reduce_dirty()
            .unwrap()
            .iter()
            .map(|t| (t.sell_sequence, t.quantity))
            .collect();
        assert_eq!(fills, vec![(3, 2), (7, 1)]);

        let pair = section.pair("X").unwrap();
        assert_eq!(pair.sells().best().map(|o| (o.sequence, o.quantity)), Some((7, 1)));
        assert!(pair.buys().is_empty());
    }

    #[test]
    fn test_terminate_wakes_waiter() {
        let global = Arc::new(GlobalBook::new());
        let waiter = {
            let global = Arc::clone(&global);
            thread::spawn(move || {
                let (_section, terminating) = global.wait_for_work();
                terminating
            })
        };

        thread::sleep(Duration::from_millis(20));
        global.terminate();
        assert!(waiter.join().unwrap());
        assert!(global.is_terminated());
    }

    #[test]
    fn test_reduce_all_prunes_empty_symbols() {
        let global = GlobalBook::new();
        global
            .merge(&mut local_with(vec![
                Order::buy("A", 10.0, 2, 0),
                Order::sell("B", 20.0, 2, 1),
            ]))
            .unwrap();
        global
            .merge(&mut local_with(vec![Order::sell("A", 9.0, 2, 2)]))
            .unwrap();

        let mut section = global.lock();
        let trades = section.reduce_all().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 10.0);
        assert_eq!(section.symbols(), vec!["B".to_string()]);
    }
}
