//! Market-data feed: snapshot grouping and the time-series merger
//!
//! Raw file parsing lives in the data-loading collaborator; this module takes
//! its typed output (`StockBar` and `QuoteRow` values) and turns it into the
//! single tick sequence the engine replays.

pub mod merge;

pub use merge::TickMerger;

use crate::types::{ChainSnapshot, OptionQuote, QuoteRow};
use std::collections::HashMap;

/// Group time-ordered quote rows into per-timestamp chain snapshots.
///
/// Rows sharing a timestamp form one snapshot; a new timestamp closes the
/// current one. The loader emits rows already sorted by time.
pub fn group_quote_rows(rows: Vec<QuoteRow>) -> Vec<ChainSnapshot> {
    let mut snapshots = Vec::new();
    let mut current_time = None;
    let mut chain: HashMap<String, OptionQuote> = HashMap::new();

    for row in rows {
        match current_time {
            Some(time) if time != row.time => {
                snapshots.push(ChainSnapshot {
                    time,
                    quotes: std::mem::take(&mut chain),
                });
                current_time = Some(row.time);
            }
            None => current_time = Some(row.time),
            _ => {}
        }
        chain.insert(
            row.symbol,
            OptionQuote {
                time: row.time,
                bid: row.bid,
                ask: row.ask,
                last: row.last,
                implied_vol: row.implied_vol,
                volume: row.volume,
            },
        );
    }

    if let Some(time) = current_time {
        snapshots.push(ChainSnapshot {
            time,
            quotes: chain,
        });
    }
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(ts: i64, symbol: &str, last: f64) -> QuoteRow {
        QuoteRow {
            time: Utc.timestamp_opt(ts, 0).unwrap(),
            symbol: symbol.to_string(),
            bid: last - 0.05,
            ask: last + 0.05,
            last,
            implied_vol: 0.2,
            volume: 1,
        }
    }

    #[test]
    fn test_group_rows_by_timestamp() {
        let rows = vec![
            row(100, "A", 1.0),
            row(100, "B", 2.0),
            row(200, "A", 1.1),
        ];
        let snapshots = group_quote_rows(rows);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].quotes.len(), 2);
        assert_eq!(snapshots[1].quotes.len(), 1);
        assert_eq!(snapshots[1].quotes["A"].last, 1.1);
    }

    #[test]
    fn test_group_empty_rows() {
        assert!(group_quote_rows(Vec::new()).is_empty());
    }
}
