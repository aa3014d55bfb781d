//! Domain types for the Matching Engine
//!
//! Orders and trades are plain values exchanged between the feed, the
//! workers and the aggregator. Only the matcher ever mutates an order's
//! quantity.

use serde::{Deserialize, Serialize};

/// Instrument identifier
pub type Symbol = String;

/// Limit price. Always finite and strictly positive once validated.
pub type Price = f64;

/// Order and trade quantity
pub type Quantity = u64;

// ============================================================================
// Side
// ============================================================================

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Returns true if this is a buy order
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }

    /// Whether an incoming order on this side at `incoming` can trade with a
    /// resting order on the opposite side at `resting`.
    pub fn crosses(&self, incoming: Price, resting: Price) -> bool {
        match self {
            Side::Buy => incoming >= resting,
            Side::Sell => incoming <= resting,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ============================================================================
// Order
// ============================================================================

/// A validated limit order.
///
/// `sequence` is the arrival index assigned at ingestion and breaks ties
/// between orders resting at the same price (oldest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Buy or Sell
    pub side: Side,
    /// Instrument being traded
    pub symbol: Symbol,
    /// Limit price
    pub price: Price,
    /// Remaining quantity to fill
    pub quantity: Quantity,
    /// Arrival index (time priority)
    pub sequence: u64,
}

impl Order {
    /// Create a new order
    pub fn new(
        side: Side,
        symbol: impl Into<Symbol>,
        price: Price,
        quantity: Quantity,
        sequence: u64,
    ) -> Self {
        Self {
            side,
            symbol: symbol.into(),
            price,
            quantity,
            sequence,
        }
    }

    /// Shorthand for a buy order
    pub fn buy(symbol: impl Into<Symbol>, price: Price, quantity: Quantity, sequence: u64) -> Self {
        Self::new(Side::Buy, symbol, price, quantity, sequence)
    }

    /// Shorthand for a sell order
    pub fn sell(symbol: impl Into<Symbol>, price: Price, quantity: Quantity, sequence: u64) -> Self {
        Self::new(Side::Sell, symbol, price, quantity, sequence)
    }

    /// Reduce quantity after a fill
    pub fn fill(&mut self, qty: Quantity) {
        debug_assert!(qty <= self.quantity, "fill exceeds remaining quantity");
        self.quantity -= qty.min(self.quantity);
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.quantity == 0
    }
}

// ============================================================================
// Trade
// ============================================================================

/// Where a trade was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeVenue {
    /// Matched inside a worker's local book
    Worker(usize),
    /// Matched by the aggregator on the global book
    Aggregator,
}

impl std::fmt::Display for TradeVenue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeVenue::Worker(index) => write!(f, "worker-{}", index),
            TradeVenue::Aggregator => write!(f, "aggregator"),
        }
    }
}

/// A matched execution between a buy and a sell order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument traded
    pub symbol: Symbol,
    /// Executed quantity (always > 0)
    pub quantity: Quantity,
    /// Execution price (the resting order's price)
    pub price: Price,
    /// Sequence of the buy order
    pub buy_sequence: u64,
    /// Sequence of the sell order
    pub sell_sequence: u64,
    /// Which component produced the trade
    pub venue: TradeVenue,
}

impl Trade {
    /// Create a new trade
    pub fn new(
        symbol: Symbol,
        quantity: Quantity,
        price: Price,
        buy_sequence: u64,
        sell_sequence: u64,
        venue: TradeVenue,
    ) -> Self {
        debug_assert!(quantity > 0, "trades always carry quantity");
        Self {
            symbol,
            quantity,
            price,
            buy_sequence,
            sell_sequence,
            venue,
        }
    }

    /// Notional value of the trade
    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }
}
