//! End-to-end behaviour of the sharded engine

use std::sync::Arc;

use assert_matches::assert_matches;
use matching_engine::{
    partition, run_sharded, EngineConfig, EngineState, LocalBook, MatchingError, Order, Quantity,
    ShardedEngine, Side, Trade, TradeLog, TradeVenue,
};
use proptest::prelude::*;

fn order_strategy() -> impl Strategy<Value = (bool, usize, u32, Quantity)> {
    (
        any::<bool>(),
        0usize..3,
        95u32..106,
        1u64..20,
    )
}

fn build_orders(raw: Vec<(bool, usize, u32, Quantity)>) -> Vec<Order> {
    const SYMBOLS: [&str; 3] = ["AAA", "BBB", "CCC"];
    raw.into_iter()
        .enumerate()
        .map(|(sequence, (is_buy, symbol, price, quantity))| {
            let side = if is_buy { Side::Buy } else { Side::Sell };
            Order::new(side, SYMBOLS[symbol], price as f64, quantity, sequence as u64)
        })
        .collect()
}

/// Trades that shard-local matching alone produces: each shard through a
/// fresh book, nothing carried between shards.
fn local_only(orders: &[Order], workers: usize) -> Vec<Trade> {
    partition(orders.to_vec(), workers)
        .into_iter()
        .flat_map(|shard| {
            let mut book = LocalBook::new(TradeVenue::Worker(0));
            shard
                .into_iter()
                .flat_map(|order| book.submit(order).unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn executions(trades: &[Trade]) -> Vec<(Quantity, u64, u64, u64)> {
    let mut pairs: Vec<_> = trades
        .iter()
        .map(|t| (t.quantity, t.price.to_bits(), t.buy_sequence, t.sell_sequence))
        .collect();
    pairs.sort_unstable();
    pairs
}

#[test]
fn test_cross_shard_orders_trade_once() {
    let log = Arc::new(TradeLog::new());
    let mut engine = ShardedEngine::start(EngineConfig::new(2, 0), log.clone()).unwrap();

    engine.submit(vec![Order::buy("X", 100.0, 3, 0)]).unwrap();
    engine.submit(vec![Order::sell("X", 100.0, 3, 1)]).unwrap();
    engine.drain().unwrap();

    let trades = log.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].symbol, "X");
    assert_eq!(trades[0].quantity, 3);
    assert_eq!(trades[0].price, 100.0);
    assert_eq!(trades[0].venue, TradeVenue::Aggregator);

    let summary = engine.summary().unwrap();
    assert_eq!(summary.local_traded_quantity(), 0);
    assert_eq!(summary.traded_quantity(), 3);
    assert!(summary.resting.orders() == 0);
}

#[test]
fn test_same_shard_trade_stays_local() {
    let log = Arc::new(TradeLog::new());
    let mut engine = ShardedEngine::start(EngineConfig::new(3, 0), log.clone()).unwrap();

    engine
        .submit(vec![Order::buy("X", 100.0, 10, 0), Order::sell("X", 100.0, 4, 1)])
        .unwrap();
    let final_pass = engine.drain().unwrap();

    assert!(final_pass.is_empty());
    let trades = log.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].venue, TradeVenue::Worker(0));

    let resting = engine.resting();
    assert_eq!(resting.buy_orders, 1);
    assert_eq!(resting.buy_quantity, 6);
    assert_eq!(resting.sell_orders, 0);
}

#[test]
fn test_second_drain_is_empty() {
    let mut engine = ShardedEngine::start(EngineConfig::new(2, 0), Arc::new(TradeLog::new())).unwrap();
    engine.submit(vec![Order::buy("X", 100.0, 3, 0)]).unwrap();
    engine.submit(vec![Order::sell("X", 100.0, 3, 1)]).unwrap();

    engine.drain().unwrap();
    assert!(engine.drain().unwrap().is_empty());
}

#[test]
fn test_submit_after_drain_is_rejected() {
    let mut engine = ShardedEngine::start(EngineConfig::default(), Arc::new(TradeLog::new())).unwrap();
    engine.drain().unwrap();

    assert_matches!(
        engine.submit(vec![Order::buy("X", 1.0, 1, 0)]),
        Err(MatchingError::NotAccepting {
            state: EngineState::Terminated
        })
    );
}

#[test]
fn test_closure_sink_receives_every_trade() {
    let count = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let sink = {
        let count = Arc::clone(&count);
        move |trade: &Trade| {
            count.fetch_add(trade.quantity, std::sync::atomic::Ordering::Relaxed);
        }
    };

    let orders = vec![
        Order::buy("X", 100.0, 5, 0),
        Order::sell("X", 100.0, 2, 1),
        Order::sell("X", 99.0, 3, 2),
    ];
    let summary = run_sharded(EngineConfig::new(2, 0), orders, Arc::new(sink)).unwrap();

    assert_eq!(summary.traded_quantity(), 5);
    assert_eq!(count.load(std::sync::atomic::Ordering::Relaxed), 5);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sharded_run_conserves_quantity(
        raw in prop::collection::vec(order_strategy(), 0..200),
        workers in 1usize..5,
        threshold in 0usize..8,
    ) {
        let orders = build_orders(raw);
        let input: Quantity = orders.iter().map(|o| o.quantity).sum();
        let log = Arc::new(TradeLog::new());

        let summary = run_sharded(EngineConfig::new(workers, threshold), orders, log.clone()).unwrap();

        prop_assert_eq!(summary.input_quantity(), input);
        prop_assert!(summary.is_conserved());
        prop_assert_eq!(log.total_quantity(), summary.traded_quantity());
        prop_assert!(log.trades().iter().all(|t| t.quantity > 0));
    }

    #[test]
    fn prop_drained_books_are_uncrossed(
        raw in prop::collection::vec(order_strategy(), 0..200),
        workers in 1usize..5,
        threshold in 0usize..8,
    ) {
        let orders = build_orders(raw);
        let mut engine = ShardedEngine::start(
            EngineConfig::new(workers, threshold),
            Arc::new(TradeLog::new()),
        ).unwrap();
        for shard in partition(orders, workers) {
            engine.submit(shard).unwrap();
        }
        engine.drain().unwrap();

        for symbol in ["AAA", "BBB", "CCC"] {
            if let Some(snapshot) = engine.snapshot(symbol, 1) {
                if let (Some(bid), Some(ask)) = (snapshot.bids.first(), snapshot.asks.first()) {
                    prop_assert!(bid.price < ask.price);
                }
            }
        }
    }

    #[test]
    fn prop_aggregator_only_adds_to_local_matching(
        raw in prop::collection::vec(order_strategy(), 0..200),
        workers in 1usize..5,
    ) {
        let orders = build_orders(raw);
        let local = local_only(&orders, workers);
        let log = Arc::new(TradeLog::new());

        let summary = run_sharded(EngineConfig::new(workers, 0), orders, log.clone()).unwrap();

        let local_quantity: Quantity = local.iter().map(|t| t.quantity).sum();
        prop_assert!(summary.traded_quantity() >= local_quantity);
        prop_assert_eq!(summary.local_traded_quantity(), local_quantity);

        let worker_trades: Vec<Trade> = log
            .trades()
            .into_iter()
            .filter(|t| t.venue != TradeVenue::Aggregator)
            .collect();
        prop_assert_eq!(executions(&worker_trades), executions(&local));
    }
}
