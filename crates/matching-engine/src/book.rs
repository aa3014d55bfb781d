//! Resting order storage
//!
//! A [`BookSide`] keeps the resting orders of one side of one symbol in
//! price-time priority. [`BookPair`] groups both sides of a symbol and
//! [`BookSet`] holds one pair per symbol. Local and global books are both
//! built from a `BookSet`.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::OccupiedEntry;
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::domain::{Order, Price, Quantity, Side, Symbol};
use crate::error::MatchingError;
use crate::Result;

type LevelKey = OrderedFloat<Price>;

// ============================================================================
// Book Side
// ============================================================================

/// Resting orders for one symbol and one side.
///
/// PROPERTIES:
/// 1. Buy side iterates highest price first, sell side lowest price first
/// 2. Each price level is ordered by ascending `sequence`
/// 3. Every resting order has `quantity > 0`
/// 4. No two resting orders share a `sequence`, whatever their price
#[derive(Debug, Clone)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<LevelKey, VecDeque<Order>>,
    sequences: HashSet<u64>,
    orders: usize,
    quantity: Quantity,
}

impl BookSide {
    /// Create an empty side
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            sequences: HashSet::new(),
            orders: 0,
            quantity: 0,
        }
    }

    /// Which side this collection holds
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_empty(&self) -> bool {
        self.orders == 0
    }

    /// Number of resting orders
    pub fn len(&self) -> usize {
        self.orders
    }

    /// Total resting quantity
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Number of distinct price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Best resting order (best price, oldest first)
    pub fn best(&self) -> Option<&Order> {
        let level = match self.side {
            Side::Buy => self.levels.last_key_value(),
            Side::Sell => self.levels.first_key_value(),
        };
        level.and_then(|(_, queue)| queue.front())
    }

    /// Best resting price
    pub fn best_price(&self) -> Option<Price> {
        self.best().map(|order| order.price)
    }

    fn best_level_mut(&mut self) -> Option<OccupiedEntry<'_, LevelKey, VecDeque<Order>>> {
        match self.side {
            Side::Buy => self.levels.last_entry(),
            Side::Sell => self.levels.first_entry(),
        }
    }

    /// Insert an order at its price-time position.
    ///
    /// Orders merged from another book keep their original sequence, so the
    /// position inside a level is found by sequence rather than appended.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.side != self.side {
            return Err(MatchingError::invariant(
                format!("{} side of {}", self.side, order.symbol),
                format!("order #{} belongs to the {} side", order.sequence, order.side),
            ));
        }
        if order.quantity == 0 {
            return Err(MatchingError::invariant(
                format!("{} side of {}", self.side, order.symbol),
                format!("order #{} inserted with zero quantity", order.sequence),
            ));
        }

        if !self.sequences.insert(order.sequence) {
            return Err(MatchingError::invariant(
                format!("{} side of {}", self.side, order.symbol),
                format!("duplicate sequence #{}", order.sequence),
            ));
        }

        let queue = self.levels.entry(OrderedFloat(order.price)).or_default();
        let position = queue.partition_point(|resting| resting.sequence < order.sequence);
        self.orders += 1;
        self.quantity += order.quantity;
        queue.insert(position, order);
        Ok(())
    }

    /// Fill the best resting order by `qty`.
    ///
    /// Returns the order if this fill completed it; it is no longer part of
    /// the side afterwards. Callers never fill more than the order holds.
    pub fn fill_best(&mut self, qty: Quantity) -> Option<Order> {
        let mut level = self.best_level_mut()?;
        let queue = level.get_mut();
        let front = queue.front_mut()?;
        debug_assert!(qty <= front.quantity);
        let qty = qty.min(front.quantity);

        front.fill(qty);
        let completed = if front.is_filled() {
            queue.pop_front()
        } else {
            None
        };
        if queue.is_empty() {
            level.remove();
        }

        self.quantity -= qty;
        if let Some(order) = &completed {
            self.sequences.remove(&order.sequence);
            self.orders -= 1;
        }
        completed
    }

    /// Move every order out of `other` into this side.
    ///
    /// Returns the number of orders moved. `other` is left empty.
    pub fn absorb(&mut self, other: &mut BookSide) -> Result<usize> {
        let levels = std::mem::take(&mut other.levels);
        other.sequences.clear();
        other.orders = 0;
        other.quantity = 0;

        let mut moved = 0;
        for order in levels.into_values().flatten() {
            self.insert(order)?;
            moved += 1;
        }
        Ok(moved)
    }

    /// Iterate resting orders in priority order
    pub fn iter(&self) -> impl Iterator<Item = &Order> + '_ {
        let levels: Box<dyn Iterator<Item = &VecDeque<Order>> + '_> = match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        };
        levels.flat_map(|queue| queue.iter())
    }

    /// Aggregated levels in priority order
    pub fn depth(&self, levels: usize) -> Vec<PriceLevel> {
        let summarize = |(price, queue): (&LevelKey, &VecDeque<Order>)| PriceLevel {
            price: price.0,
            quantity: queue.iter().map(|o| o.quantity).sum(),
            order_count: queue.len(),
        };
        match self.side {
            Side::Buy => self.levels.iter().rev().take(levels).map(summarize).collect(),
            Side::Sell => self.levels.iter().take(levels).map(summarize).collect(),
        }
    }

    /// Check every structural invariant of this side.
    pub fn verify(&self, symbol: &str) -> Result<()> {
        let context = || format!("{} side of {}", self.side, symbol);
        let mut seen = HashSet::with_capacity(self.orders);
        let mut orders = 0;
        let mut quantity = 0;

        for (price, queue) in &self.levels {
            if queue.is_empty() {
                return Err(MatchingError::invariant(
                    context(),
                    format!("empty price level {}", price),
                ));
            }
            let mut previous: Option<u64> = None;
            for order in queue {
                if order.quantity == 0 {
                    return Err(MatchingError::invariant(
                        context(),
                        format!("order #{} rests with zero quantity", order.sequence),
                    ));
                }
                if order.side != self.side || OrderedFloat(order.price) != *price {
                    return Err(MatchingError::invariant(
                        context(),
                        format!("order #{} filed under the wrong level", order.sequence),
                    ));
                }
                if previous.is_some_and(|prev| prev >= order.sequence) {
                    return Err(MatchingError::invariant(
                        context(),
                        format!(
                            "sequence #{} follows #{} at price {}",
                            order.sequence,
                            previous.unwrap_or_default(),
                            price
                        ),
                    ));
                }
                if !seen.insert(order.sequence) {
                    return Err(MatchingError::invariant(
                        context(),
                        format!("duplicate sequence #{}", order.sequence),
                    ));
                }
                previous = Some(order.sequence);
                orders += 1;
                quantity += order.quantity;
            }
        }

        if seen != self.sequences {
            return Err(MatchingError::invariant(
                context(),
                "tracked sequences differ from resting orders".to_string(),
            ));
        }
        if orders != self.orders || quantity != self.quantity {
            return Err(MatchingError::invariant(
                context(),
                format!(
                    "totals drifted: counted {} orders / {} qty, tracked {} / {}",
                    orders, quantity, self.orders, self.quantity
                ),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Book Pair
// ============================================================================

/// Both sides of one symbol
#[derive(Debug, Clone)]
pub struct BookPair {
    symbol: Symbol,
    pub(crate) buys: BookSide,
    pub(crate) sells: BookSide,
}

impl BookPair {
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            buys: BookSide::new(Side::Buy),
            sells: BookSide::new(Side::Sell),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn buys(&self) -> &BookSide {
        &self.buys
    }

    pub fn sells(&self) -> &BookSide {
        &self.sells
    }

    /// Side holding orders of `side`
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    /// Split into (same side, counter side) for an incoming order of `side`
    pub fn sides_mut(&mut self, side: Side) -> (&mut BookSide, &mut BookSide) {
        match side {
            Side::Buy => (&mut self.buys, &mut self.sells),
            Side::Sell => (&mut self.sells, &mut self.buys),
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.buys.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.sells.best_price()
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// True when the best bid can trade with the best ask
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid >= ask)
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.buys.len() + self.sells.len()
    }

    pub fn quantity(&self) -> Quantity {
        self.buys.quantity() + self.sells.quantity()
    }

    /// Move both sides of `other` into this pair
    pub fn absorb(&mut self, other: &mut BookPair) -> Result<usize> {
        Ok(self.buys.absorb(&mut other.buys)? + self.sells.absorb(&mut other.sells)?)
    }

    /// Structural invariants of both sides
    pub fn verify(&self) -> Result<()> {
        self.buys.verify(&self.symbol)?;
        self.sells.verify(&self.symbol)
    }

    /// Structural invariants plus "not crossed" (valid after a full reduction)
    pub fn verify_settled(&self) -> Result<()> {
        self.verify()?;
        if self.is_crossed() {
            return Err(MatchingError::invariant(
                format!("book {}", self.symbol),
                format!(
                    "crossed after reduction: bid {:?} >= ask {:?}",
                    self.best_bid(),
                    self.best_ask()
                ),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Book Set
// ============================================================================

/// One [`BookPair`] per symbol, iterated in symbol order
#[derive(Debug, Clone, Default)]
pub struct BookSet {
    books: BTreeMap<Symbol, BookPair>,
}

impl BookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the pair for `symbol`
    pub fn pair_mut(&mut self, symbol: &str) -> &mut BookPair {
        self.books
            .entry(symbol.to_string())
            .or_insert_with(|| BookPair::new(symbol))
    }

    pub fn pair(&self, symbol: &str) -> Option<&BookPair> {
        self.books.get(symbol)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &BookPair> + '_ {
        self.books.values()
    }

    pub fn pairs_mut(&mut self) -> impl Iterator<Item = &mut BookPair> + '_ {
        self.books.values_mut()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.books.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.books.values().all(BookPair::is_empty)
    }

    /// Resting totals over every symbol
    pub fn totals(&self) -> BookTotals {
        self.books.values().fold(BookTotals::default(), |mut acc, pair| {
            acc.buy_orders += pair.buys.len();
            acc.buy_quantity += pair.buys.quantity();
            acc.sell_orders += pair.sells.len();
            acc.sell_quantity += pair.sells.quantity();
            acc
        })
    }

    /// Move every resting order out of `other`, symbol by symbol.
    ///
    /// Returns the symbols that received orders and the number moved.
    pub fn absorb(&mut self, other: &mut BookSet) -> Result<(Vec<Symbol>, usize)> {
        let mut touched = Vec::new();
        let mut moved = 0;
        for (symbol, mut pair) in std::mem::take(&mut other.books) {
            if pair.is_empty() {
                continue;
            }
            moved += self.pair_mut(&symbol).absorb(&mut pair)?;
            touched.push(symbol);
        }
        Ok((touched, moved))
    }

    /// Remove symbols with no resting orders
    pub fn prune(&mut self) {
        self.books.retain(|_, pair| !pair.is_empty());
    }

    pub fn verify(&self) -> Result<()> {
        self.books.values().try_for_each(BookPair::verify)
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Resting order counts and quantities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTotals {
    pub buy_orders: usize,
    pub buy_quantity: Quantity,
    pub sell_orders: usize,
    pub sell_quantity: Quantity,
}

impl BookTotals {
    pub fn orders(&self) -> usize {
        self.buy_orders + self.sell_orders
    }

    pub fn quantity(&self) -> Quantity {
        self.buy_quantity + self.sell_quantity
    }
}

/// Aggregated price level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price
    pub price: Price,
    /// Total quantity at this price
    pub quantity: Quantity,
    /// Number of orders at this price
    pub order_count: usize,
}

/// Depth snapshot of one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    /// Bid levels (best first)
    pub bids: Vec<PriceLevel>,
    /// Ask levels (best first)
    pub asks: Vec<PriceLevel>,
    pub taken_at: DateTime<Utc>,
}

impl BookSnapshot {
    pub fn from_pair(pair: &BookPair, depth: usize) -> Self {
        Self {
            symbol: pair.symbol.clone(),
            bids: pair.buys.depth(depth),
            asks: pair.sells.depth(depth),
            taken_at: Utc::now(),
        }
    }
}
