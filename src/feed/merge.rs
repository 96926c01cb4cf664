//! Time-series merger
//!
//! Combines the fixed-cadence bar stream and the irregular chain-snapshot
//! stream into one sequence of ticks with non-decreasing timestamps. Each
//! tick carries the latest known value of every stream (carry-forward), even
//! for streams that did not advance at that timestamp.

use crate::feed::group_quote_rows;
use crate::types::{ChainSnapshot, OptionQuote, QuoteRow, StockBar, Tick};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::iter::Peekable;
use std::vec::IntoIter;

/// Lazy, forward-only merger over the bar and option-chain streams.
///
/// Non-restartable: construct a new instance to replay.
pub struct TickMerger {
    bars: Peekable<IntoIter<StockBar>>,
    chains: Peekable<IntoIter<ChainSnapshot>>,
    latest_bar: Option<StockBar>,
    latest_quotes: HashMap<String, OptionQuote>,
    ticks_emitted: u64,
}

impl TickMerger {
    pub fn new(bars: Vec<StockBar>, chains: Vec<ChainSnapshot>) -> Self {
        Self {
            bars: bars.into_iter().peekable(),
            chains: chains.into_iter().peekable(),
            latest_bar: None,
            latest_quotes: HashMap::new(),
            ticks_emitted: 0,
        }
    }

    /// Build a merger straight from ungrouped quote rows
    pub fn from_rows(bars: Vec<StockBar>, rows: Vec<QuoteRow>) -> Self {
        Self::new(bars, group_quote_rows(rows))
    }

    /// Timestamp of the next tick, if any
    pub fn peek_time(&mut self) -> Option<DateTime<Utc>> {
        let bar_time = self.bars.peek().map(|b| b.time);
        let chain_time = self.chains.peek().map(|c| c.time);
        match (bar_time, chain_time) {
            (Some(b), Some(c)) => Some(b.min(c)),
            (Some(b), None) => Some(b),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        }
    }

    /// True when the upcoming tick falls on a different calendar date than
    /// `current`, or when no further ticks exist.
    pub fn is_end_of_day(&mut self, current: DateTime<Utc>) -> bool {
        match self.peek_time() {
            Some(next) => next.date_naive() != current.date_naive(),
            None => true,
        }
    }

    /// Number of ticks emitted so far
    pub fn tick_count(&self) -> u64 {
        self.ticks_emitted
    }
}

impl Iterator for TickMerger {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        let time = self.peek_time()?;

        if self.bars.peek().map(|b| b.time) == Some(time) {
            // advance the bar stream; its value becomes the new latest
            self.latest_bar = self.bars.next();
        }
        if self.chains.peek().map(|c| c.time) == Some(time) {
            if let Some(chain) = self.chains.next() {
                self.latest_quotes = chain.quotes;
            }
        }

        self.ticks_emitted += 1;
        Some(Tick {
            time,
            bar: self.latest_bar.clone(),
            quotes: self.latest_quotes.clone(),
        })
    }
}
