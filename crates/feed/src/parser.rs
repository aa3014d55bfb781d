//! Line-oriented order feed
//!
//! One order per line: `SIDE SYMBOL QUANTITY PRICE`, whitespace separated.
//! `SIDE` is `BUY` or `SELL` in any case. Blank lines and lines starting
//! with `#` are skipped.

use std::io::BufRead;

use matching_engine::{Price, Side, Symbol};

use crate::error::{FeedError, ValidationError};

/// A syntactically and semantically valid input record, before it is
/// given a sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// 1-based line number in the feed
    pub line: usize,
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: u64,
    pub price: Price,
}

/// Parse a side token (`BUY` / `SELL`, case-insensitive)
pub fn parse_side(token: &str) -> Option<Side> {
    if token.eq_ignore_ascii_case("buy") {
        Some(Side::Buy)
    } else if token.eq_ignore_ascii_case("sell") {
        Some(Side::Sell)
    } else {
        None
    }
}

/// Parse and validate one line.
///
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: usize, text: &str) -> Result<Option<OrderRecord>, ValidationError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = text.split_whitespace().collect();
    let [side, symbol, quantity, price] = fields.as_slice() else {
        return Err(ValidationError::FieldCount {
            line,
            fields: fields.len(),
        });
    };

    let side = parse_side(side).ok_or_else(|| ValidationError::UnknownSide {
        line,
        side: side.to_string(),
    })?;

    let quantity: i64 = quantity
        .parse()
        .map_err(|_| ValidationError::MalformedQuantity {
            line,
            value: quantity.to_string(),
        })?;
    if quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity { line, quantity });
    }

    let price: f64 = price.parse().map_err(|_| ValidationError::MalformedPrice {
        line,
        value: price.to_string(),
    })?;
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::InvalidPrice { line, price });
    }

    Ok(Some(OrderRecord {
        line,
        side,
        symbol: symbol.to_string(),
        quantity: quantity as u64,
        price,
    }))
}

/// Iterates over the records of a feed, skipping blank and comment lines.
///
/// Each item is either a read failure (which ends the feed) or the outcome
/// of validating one record.
pub struct FeedReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> FeedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for FeedReader<R> {
    type Item = Result<Result<OrderRecord, ValidationError>, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(err) => return Some(Err(FeedError::Io(err))),
            };
            self.line += 1;
            match parse_line(self.line, &text) {
                Ok(None) => continue,
                Ok(Some(record)) => return Some(Ok(Ok(record))),
                Err(err) => return Some(Ok(Err(err))),
            }
        }
    }
}
