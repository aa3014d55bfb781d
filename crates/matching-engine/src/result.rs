//! Result types for matching operations

use super::domain::{Order, Quantity, Trade};

/// Result of matching one incoming order
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Trades generated, in execution order
    pub trades: Vec<Trade>,
    /// Unfilled remainder, to be rested on the order's own side
    pub remaining: Option<Order>,
}

impl MatchResult {
    /// No match occurred
    pub fn no_match(order: Order) -> Self {
        Self {
            trades: vec![],
            remaining: Some(order),
        }
    }

    /// Order was fully matched
    pub fn fully_matched(trades: Vec<Trade>) -> Self {
        Self {
            trades,
            remaining: None,
        }
    }

    /// Order was partially matched
    pub fn partial_match(trades: Vec<Trade>, remaining: Order) -> Self {
        Self {
            trades,
            remaining: Some(remaining),
        }
    }

    /// Nothing to do (zero quantity input)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if any trades were generated
    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }

    /// Total quantity filled
    pub fn filled_quantity(&self) -> Quantity {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}
