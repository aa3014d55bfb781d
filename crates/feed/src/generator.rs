//! Synthetic order feed
//!
//! Reproducible random orders driven by a seeded `ChaCha8Rng`: the same
//! settings always produce the same feed.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::ops::Range;
use tracing::info;

use matching_engine::{Order, Side};

use crate::error::FeedError;

/// Generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of orders to produce
    pub count: usize,
    /// Symbols, chosen uniformly
    pub symbols: Vec<String>,
    /// Lower bound of the price range (inclusive)
    pub price_min: f64,
    /// Upper bound of the price range (exclusive)
    pub price_max: f64,
    /// Quantities are drawn from `1..=max_quantity`
    pub max_quantity: u64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            symbols: vec!["TSM".to_string()],
            price_min: 100.0,
            price_max: 200.0,
            max_quantity: 10,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.symbols.is_empty() {
            return Err(FeedError::InvalidGenerator("no symbols configured".into()));
        }
        if self.symbols.iter().any(|s| s.is_empty() || s.contains(char::is_whitespace)) {
            return Err(FeedError::InvalidGenerator(
                "symbols must be non-empty and contain no whitespace".into(),
            ));
        }
        if !(self.price_min.is_finite() && self.price_max.is_finite()) || self.price_min <= 0.0 {
            return Err(FeedError::InvalidGenerator(
                "price range must be finite and positive".into(),
            ));
        }
        if self.price_min >= self.price_max {
            return Err(FeedError::InvalidGenerator(format!(
                "price_min ({}) must be below price_max ({})",
                self.price_min, self.price_max
            )));
        }
        if cent_range(self.price_min, self.price_max).is_empty() {
            return Err(FeedError::InvalidGenerator(format!(
                "no whole cent lies in [{}, {})",
                self.price_min, self.price_max
            )));
        }
        if self.max_quantity == 0 {
            return Err(FeedError::InvalidGenerator("max_quantity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Endless stream of random orders
pub struct OrderGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    cents: Range<u64>,
    sequence: u64,
}

impl OrderGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let cents = cent_range(config.price_min, config.price_max);
        Ok(Self {
            config,
            rng,
            cents,
            sequence: 0,
        })
    }

    /// Next random order, sequenced from zero
    pub fn next_order(&mut self) -> Order {
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let symbol = &self.config.symbols[self.rng.gen_range(0..self.config.symbols.len())];
        let quantity = self.rng.gen_range(1..=self.config.max_quantity);
        let price = self.rng.gen_range(self.cents.clone()) as f64 / 100.0;

        let order = Order::new(side, symbol.as_str(), price, quantity, self.sequence);
        self.sequence += 1;
        order
    }
}

impl Iterator for OrderGenerator {
    type Item = Order;

    fn next(&mut self) -> Option<Order> {
        Some(self.next_order())
    }
}

/// Whole cents `c` with `min <= c / 100 < max`.
///
/// Prices stay at two decimals so the text feed reads back exactly.
fn cent_range(min: f64, max: f64) -> Range<u64> {
    let mut lo = (min * 100.0).ceil() as u64;
    while (lo as f64) / 100.0 < min {
        lo += 1;
    }
    let mut hi = (max * 100.0).ceil() as u64;
    while hi > 0 && ((hi - 1) as f64) / 100.0 >= max {
        hi -= 1;
    }
    lo..hi.max(lo)
}

/// Generate `config.count` orders in memory
pub fn generate(config: &GeneratorConfig) -> Result<Vec<Order>, FeedError> {
    Ok(OrderGenerator::new(config.clone())?.take(config.count).collect())
}

/// Write `config.count` orders to `writer` in the feed line format.
///
/// Returns the number of lines written.
pub fn generate_orders<W: Write>(config: &GeneratorConfig, mut writer: W) -> Result<usize, FeedError> {
    let generator = OrderGenerator::new(config.clone())?;
    for order in generator.take(config.count) {
        writeln!(
            writer,
            "{} {} {} {}",
            order.side, order.symbol, order.quantity, order.price
        )?;
    }
    writer.flush()?;

    info!(
        count = config.count,
        symbols = config.symbols.len(),
        seed = config.seed,
        "Generated order feed"
    );
    Ok(config.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, RejectPolicy};
    use proptest::prelude::*;

    fn config(count: usize, seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            count,
            symbols: vec!["AAA".into(), "BBB".into()],
            seed,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_feed() {
        let first = generate(&config(50, 7)).unwrap();
        let second = generate(&config(50, 7)).unwrap();
        assert_eq!(first, second);

        let other = generate(&config(50, 8)).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_generated_feed_parses_back() {
        let config = config(100, 1);
        let mut buffer = Vec::new();
        assert_eq!(generate_orders(&config, &mut buffer).unwrap(), 100);

        let (orders, report) = ingest(buffer.as_slice(), 0, RejectPolicy::Fail).unwrap();
        assert_eq!(report.accepted, 100);
        assert_eq!(orders, generate(&config).unwrap());
    }

    #[test]
    fn test_invalid_settings() {
        let mut bad = config(1, 0);
        bad.price_max = bad.price_min;
        assert!(matches!(generate(&bad), Err(FeedError::InvalidGenerator(_))));

        let mut bad = config(1, 0);
        bad.symbols.clear();
        assert!(OrderGenerator::new(bad).is_err());

        let mut bad = config(1, 0);
        bad.max_quantity = 0;
        assert!(OrderGenerator::new(bad).is_err());
    }

    #[test]
    fn test_narrow_range_stays_below_max() {
        let config = GeneratorConfig {
            price_min: 100.0,
            price_max: 100.01,
            ..config(200, 3)
        };
        for order in generate(&config).unwrap() {
            assert_eq!(order.price, 100.0);
        }
    }

    #[test]
    fn test_range_without_a_whole_cent_is_rejected() {
        let config = GeneratorConfig {
            price_min: 100.001,
            price_max: 100.009,
            ..config(1, 0)
        };
        assert!(matches!(config.validate(), Err(FeedError::InvalidGenerator(_))));
    }

    proptest! {
        #[test]
        fn prop_orders_within_bounds(
            seed in any::<u64>(),
            max_quantity in 1u64..50,
            price_min in 1.0f64..500.0,
            width in 0.01f64..5.0,
        ) {
            let config = GeneratorConfig {
                max_quantity,
                seed,
                price_min,
                price_max: price_min + width,
                ..config(64, seed)
            };
            prop_assume!(config.validate().is_ok());
            for order in generate(&config).unwrap() {
                prop_assert!(order.quantity >= 1 && order.quantity <= max_quantity);
                prop_assert!(order.price >= config.price_min);
                prop_assert!(order.price < config.price_max);
                prop_assert!(config.symbols.contains(&order.symbol));
            }
        }
    }
}
