//! Core types for the backtesting engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Contract multiplier for equity options
pub const OPTION_MULTIPLIER: i64 = 100;

/// Order side (buy/sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Option right (call/put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

/// An equity option contract
///
/// Identity includes the underlying product id, so two contracts on different
/// underlyings never collide even when (right, expiration, strike) match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionContract {
    /// Underlying product symbol
    pub product: String,
    /// Call or put
    pub right: OptionRight,
    /// Expiration instant
    pub expiration: DateTime<Utc>,
    /// Strike price in whole dollars
    pub strike: i64,
}

impl OptionContract {
    /// Build a contract expiring on the given date.
    ///
    /// Options stop trading at 16:00 but can be exercised until 16:30, so the
    /// expiration instant is pinned to 16:30 on expiration day.
    pub fn expiring_on(
        product: impl Into<String>,
        right: OptionRight,
        date: NaiveDate,
        strike: i64,
    ) -> Self {
        let expiration = date
            .and_hms_opt(16, 30, 0)
            .expect("16:30:00 is a valid time")
            .and_utc();
        Self {
            product: product.into(),
            right,
            expiration,
            strike,
        }
    }

    pub fn is_call(&self) -> bool {
        self.right == OptionRight::Call
    }

    /// Quote-table key for this contract
    pub fn symbol(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OptionContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{}{}",
            self.product,
            self.expiration.format("%Y%m%d"),
            if self.is_call() { 'C' } else { 'P' },
            self.strike
        )
    }
}

/// A tradable instrument: an option contract or a bare stock symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Option(OptionContract),
    Stock(String),
}

impl Instrument {
    pub fn is_option(&self) -> bool {
        matches!(self, Instrument::Option(_))
    }

    pub fn as_option(&self) -> Option<&OptionContract> {
        match self {
            Instrument::Option(contract) => Some(contract),
            Instrument::Stock(_) => None,
        }
    }

    /// Cash multiplier applied to premium calculations
    pub fn multiplier(&self) -> i64 {
        match self {
            Instrument::Option(_) => OPTION_MULTIPLIER,
            Instrument::Stock(_) => 1,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Option(contract) => contract.fmt(f),
            Instrument::Stock(symbol) => symbol.fmt(f),
        }
    }
}

/// An order queued by a strategy
///
/// Option orders fill at the market (or theoretical) price; `limit_price` is
/// only meaningful for stock orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique increasing id
    pub id: u64,
    /// Order side
    pub side: Side,
    /// Instrument being traded
    pub instrument: Instrument,
    /// Limit price (stock orders only)
    pub limit_price: f64,
    /// Requested quantity, always positive
    pub qty: i64,
    /// Owning product symbol
    pub product: String,
}

impl Order {
    pub fn is_option(&self) -> bool {
        self.instrument.is_option()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} {} {} at ${} x {}qty",
            self.id, self.side, self.instrument, self.limit_price, self.qty
        )
    }
}

/// An executed trade produced by the matching engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Originating order
    pub order: Order,
    /// Realized fill price
    pub price: f64,
    /// Filled quantity
    pub qty: i64,
}

impl Trade {
    pub fn new(order: Order, price: f64, qty: i64) -> Self {
        Self { order, price, qty }
    }

    /// Cash premium paid/received for this trade
    pub fn premium(&self) -> f64 {
        self.price * self.qty as f64 * self.order.instrument.multiplier() as f64
    }
}

/// Terminal state of a settled option trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Assigned,
    Expired,
}

/// One OHLC bar from the stock stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Latest observed quote for one option contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub time: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    /// Last trade price
    pub last: f64,
    /// Implied volatility reported by the data source
    pub implied_vol: f64,
    pub volume: i64,
}

impl OptionQuote {
    /// Zero-width or crossed market (data-quality signal, still usable)
    pub fn is_crossed(&self) -> bool {
        self.bid >= self.ask
    }
}

/// One option-quote row as produced by the data-loading collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRow {
    pub time: DateTime<Utc>,
    /// Contract symbol the row belongs to
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub implied_vol: f64,
    pub volume: i64,
}

/// All option quotes sharing one observation timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub time: DateTime<Utc>,
    pub quotes: HashMap<String, OptionQuote>,
}

/// Snapshot of the market combining the stock bar and the option chain
///
/// Produced only by the merger. `bar` stays `None` until the bar stream has
/// produced its first item; quotes carry forward between chain updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub bar: Option<StockBar>,
    pub quotes: HashMap<String, OptionQuote>,
}

/// Strategy metadata for log and report labeling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetadata {
    /// Strategy name
    pub name: String,
    /// Short description
    pub description: String,
}

/// One end-of-day valuation snapshot
///
/// The engine guarantees exactly one entry per trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub time: DateTime<Utc>,
    /// Cash plus stock position marked at the closing price
    pub nav: f64,
    /// Stock position × closing price
    pub stock_value: f64,
    /// Running net option premium
    pub option_premium: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn spy_call(strike: i64) -> OptionContract {
        OptionContract::expiring_on(
            "SPY",
            OptionRight::Call,
            NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
            strike,
        )
    }

    #[test]
    fn test_option_symbol_format() {
        let call = spy_call(550);
        assert_eq!(call.symbol(), "SPY20250718-C550");

        let put = OptionContract {
            right: OptionRight::Put,
            ..call
        };
        assert_eq!(put.symbol(), "SPY20250718-P550");
    }

    #[test]
    fn test_option_identity_includes_product() {
        let spy = spy_call(550);
        let qqq = OptionContract {
            product: "QQQ".to_string(),
            ..spy.clone()
        };
        assert_ne!(spy, qqq);
    }

    #[test]
    fn test_trade_premium_multiplier() {
        let order = Order {
            id: 0,
            side: Side::Sell,
            instrument: Instrument::Option(spy_call(550)),
            limit_price: 0.0,
            qty: 2,
            product: "SPY".to_string(),
        };
        let trade = Trade::new(order, 1.25, 2);
        assert_eq!(trade.premium(), 250.0);

        let stock_order = Order {
            id: 1,
            side: Side::Buy,
            instrument: Instrument::Stock("SPY".to_string()),
            limit_price: 550.0,
            qty: 10,
            product: "SPY".to_string(),
        };
        let stock_trade = Trade::new(stock_order, 550.0, 10);
        assert_eq!(stock_trade.premium(), 5500.0);
    }

    #[test]
    fn test_crossed_quote_detection() {
        let quote = OptionQuote {
            time: Utc::now(),
            bid: 1.10,
            ask: 1.10,
            last: 1.05,
            implied_vol: 0.2,
            volume: 10,
        };
        assert!(quote.is_crossed());
    }
}
