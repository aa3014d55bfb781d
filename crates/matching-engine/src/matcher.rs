//! Single-book matching
//!
//! Pure price-time priority matching over [`BookSide`]s. Nothing in here
//! locks or allocates beyond the trades it returns; callers decide which book
//! (local or global) the sides belong to.

use tracing::trace;

use crate::book::{BookPair, BookSide};
use crate::domain::{Order, Side, Trade, TradeVenue};
use crate::result::MatchResult;

/// Match `incoming` against the opposite side of its book.
///
/// Trades execute at the resting order's price. Resting orders at the same
/// price are consumed oldest first. Any remainder is handed back to the
/// caller, who rests it on the incoming order's own side.
///
/// A buy at 101 meeting a resting sell at 99 trades at 99, but a sell at 99
/// meeting a resting buy at 101 trades at 101: the price is never fixed to
/// the sell side.
pub fn match_order(mut incoming: Order, counter_side: &mut BookSide, venue: TradeVenue) -> MatchResult {
    if incoming.is_filled() {
        return MatchResult::empty();
    }
    debug_assert_eq!(counter_side.side(), incoming.side.opposite());

    let mut trades = Vec::new();
    while !incoming.is_filled() {
        let Some(resting) = counter_side.best() else {
            break;
        };
        if !incoming.side.crosses(incoming.price, resting.price) {
            break;
        }

        let filled = incoming.quantity.min(resting.quantity);
        let (buy_sequence, sell_sequence) = match incoming.side {
            Side::Buy => (incoming.sequence, resting.sequence),
            Side::Sell => (resting.sequence, incoming.sequence),
        };
        let trade = Trade::new(
            incoming.symbol.clone(),
            filled,
            resting.price,
            buy_sequence,
            sell_sequence,
            venue,
        );
        trace!(
            symbol = %trade.symbol,
            quantity = trade.quantity,
            price = trade.price,
            buy = buy_sequence,
            sell = sell_sequence,
            %venue,
            "Trade executed"
        );

        counter_side.fill_best(filled);
        incoming.fill(filled);
        trades.push(trade);
    }

    if incoming.is_filled() {
        MatchResult::fully_matched(trades)
    } else if trades.is_empty() {
        MatchResult::no_match(incoming)
    } else {
        MatchResult::partial_match(trades, incoming)
    }
}

/// Trade away every cross between the two sides of `pair`.
///
/// Either side may be treated as incoming: the order that arrived first
/// (lower sequence) is the resting one and sets the execution price. On
/// return the pair is no longer crossed.
pub fn reduce_crossed(pair: &mut BookPair, venue: TradeVenue) -> Vec<Trade> {
    let mut trades = Vec::new();
    loop {
        let (Some(buy), Some(sell)) = (pair.buys.best(), pair.sells.best()) else {
            break;
        };
        if buy.price < sell.price {
            break;
        }

        let filled = buy.quantity.min(sell.quantity);
        let price = if buy.sequence < sell.sequence {
            buy.price
        } else {
            sell.price
        };
        let trade = Trade::new(
            pair.symbol().to_string(),
            filled,
            price,
            buy.sequence,
            sell.sequence,
            venue,
        );
        trace!(
            symbol = %trade.symbol,
            quantity = filled,
            price,
            buy = trade.buy_sequence,
            sell = trade.sell_sequence,
            %venue,
            "Cross reduced"
        );

        pair.buys.fill_best(filled);
        pair.sells.fill_best(filled);
        trades.push(trade);
    }
    trades
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: TradeVenue = TradeVenue::Worker(0);

    fn sells(orders: &[(f64, u64, u64)]) -> BookSide {
        let mut side = BookSide::new(Side::Sell);
        for &(price, qty, seq) in orders {
            side.insert(Order::sell("X", price, qty, seq)).unwrap();
        }
        side
    }

    #[test]
    fn test_no_cross_returns_order_untouched() {
        let mut asks = sells(&[(101.0, 5, 1)]);
        let result = match_order(Order::buy("X", 100.0, 5, 2), &mut asks, LOCAL);

        assert!(!result.has_trades());
        assert_eq!(result.remaining.unwrap().quantity, 5);
        assert_eq!(asks.quantity(), 5);
    }

    #[test]
    fn test_zero_quantity_is_noop() {
        let mut asks = sells(&[(100.0, 5, 1)]);
        let result = match_order(Order::buy("X", 100.0, 0, 2), &mut asks, LOCAL);

        assert!(!result.has_trades());
        assert!(result.remaining.is_none());
        assert_eq!(asks.quantity(), 5);
    }

    #[test]
    fn test_trade_executes_at_resting_price() {
        let mut asks = sells(&[(99.0, 5, 1)]);
        let result = match_order(Order::buy("X", 101.0, 5, 2), &mut asks, LOCAL);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].price, 99.0);
        assert_eq!(result.trades[0].quantity, 5);
        assert!(result.remaining.is_none());
        assert!(asks.is_empty());
    }

    #[test]
    fn test_walks_price_levels_best_first() {
        let mut asks = sells(&[(102.0, 5, 1), (100.0, 2, 2), (101.0, 2, 3)]);
        let result = match_order(Order::buy("X", 101.0, 10, 4), &mut asks, LOCAL);

        let prices: Vec<f64> = result.trades.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![100.0, 101.0]);
        assert_eq!(result.filled_quantity(), 4);
        assert_eq!(result.remaining.unwrap().quantity, 6);
        assert_eq!(asks.best_price(), Some(102.0));
    }

    #[test]
    fn test_same_price_fills_oldest_first() {
        let mut asks = sells(&[(100.0, 3, 5), (100.0, 3, 2), (100.0, 3, 9)]);
        let result = match_order(Order::buy("X", 100.0, 4, 10), &mut asks, LOCAL);

        let fills: Vec<(u64, u64)> = result
            .trades
            .iter()
            .map(|t| (t.sell_sequence, t.quantity))
            .collect();
        assert_eq!(fills, vec![(2, 3), (5, 1)]);
        assert_eq!(asks.best().unwrap().sequence, 5);
        assert_eq!(asks.best().unwrap().quantity, 2);
    }

    #[test]
    fn test_sell_matches_against_bids() {
        let mut bids = BookSide::new(Side::Buy);
        bids.insert(Order::buy("X", 100.0, 10, 1)).unwrap();
        let result = match_order(Order::sell("X", 100.0, 4, 2), &mut bids, LOCAL);

        assert_eq!(result.trades[0].buy_sequence, 1);
        assert_eq!(result.trades[0].sell_sequence, 2);
        assert_eq!(result.trades[0].price, 100.0);
        assert_eq!(bids.best().unwrap().quantity, 6);
    }

    #[test]
    fn test_reduce_crossed_uses_older_order_price() {
        let mut pair = BookPair::new("X");
        pair.buys.insert(Order::buy("X", 101.0, 5, 1)).unwrap();
        pair.sells.insert(Order::sell("X", 99.0, 3, 2)).unwrap();
        pair.sells.insert(Order::sell("X", 100.0, 4, 3)).unwrap();

        let trades = reduce_crossed(&mut pair, TradeVenue::Aggregator);

        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].quantity, trades[0].price), (3, 101.0));
        assert_eq!((trades[1].quantity, trades[1].price), (2, 101.0));
        assert!(pair.buys.is_empty());
        assert_eq!(pair.sells.quantity(), 2);
        pair.verify_settled().unwrap();
    }

    #[test]
    fn test_reduce_crossed_stops_at_spread() {
        let mut pair = BookPair::new("X");
        pair.buys.insert(Order::buy("X", 99.0, 5, 4)).unwrap();
        pair.sells.insert(Order::sell("X", 98.0, 2, 1)).unwrap();
        pair.sells.insert(Order::sell("X", 100.0, 2, 2)).unwrap();

        let trades = reduce_crossed(&mut pair, TradeVenue::Aggregator);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 98.0);
        assert_eq!(pair.best_bid(), Some(99.0));
        assert_eq!(pair.best_ask(), Some(100.0));
        assert!(!pair.is_crossed());
    }
}
