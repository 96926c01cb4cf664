//! Position ledger and trade book
//!
//! The ledger tracks cash and signed position quantities; the trade book
//! tracks every fill and the lifecycle of option trades (open until assigned
//! or expired).

use crate::types::{Instrument, Settlement, Side, Trade};
use std::collections::HashMap;
use tracing::debug;

/// Cash and position balances
///
/// Invariant: an instrument never has a zero-quantity entry; positions are
/// removed once netted to zero.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    cash: f64,
    positions: HashMap<Instrument, i64>,
    /// Net option premium collected (sells) minus paid (buys)
    option_premium_net: f64,
}

impl PositionLedger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            positions: HashMap::new(),
            option_premium_net: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn option_premium_net(&self) -> f64 {
        self.option_premium_net
    }

    /// Signed quantity held in the instrument (0 when absent)
    pub fn position(&self, instrument: &Instrument) -> i64 {
        self.positions.get(instrument).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &HashMap<Instrument, i64> {
        &self.positions
    }

    /// Adjust a position by a signed quantity, dropping zeroed entries
    pub fn add_position(&mut self, instrument: Instrument, qty: i64) {
        let entry = self.positions.entry(instrument.clone()).or_insert(0);
        *entry += qty;
        if *entry == 0 {
            self.positions.remove(&instrument);
        }
    }

    pub fn adjust_cash(&mut self, delta: f64) {
        self.cash += delta;
    }

    /// Apply a trade to cash and positions.
    ///
    /// Buys pay the premium and add quantity; sells receive the premium and
    /// subtract quantity.
    pub fn apply(&mut self, trade: &Trade) {
        let premium = trade.premium();
        match trade.order.side {
            Side::Buy => {
                self.cash -= premium;
                if trade.order.is_option() {
                    self.option_premium_net -= premium;
                }
                self.add_position(trade.order.instrument.clone(), trade.qty);
            }
            Side::Sell => {
                self.cash += premium;
                if trade.order.is_option() {
                    self.option_premium_net += premium;
                }
                self.add_position(trade.order.instrument.clone(), -trade.qty);
            }
        }
        debug!(
            order_id = trade.order.id,
            cash = self.cash,
            "ledger applied trade"
        );
    }
}

/// Record of every fill plus option-trade lifecycle buckets
#[derive(Debug, Clone, Default)]
pub struct TradeBook {
    /// All fills, in execution order
    pub fills: Vec<Trade>,
    /// Option trades awaiting settlement
    pub open_options: Vec<Trade>,
    /// Option trades exercised against the book
    pub assigned: Vec<Trade>,
    /// Option trades that expired worthless
    pub expired: Vec<Trade>,
}

impl TradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fill(&mut self, trade: &Trade) {
        self.fills.push(trade.clone());
        if trade.order.is_option() {
            self.open_options.push(trade.clone());
        }
    }

    /// Move an open option trade to its terminal bucket.
    ///
    /// Returns the settled trade, or `None` if no open trade carries the
    /// order id (already settled or never booked).
    pub fn settle(&mut self, order_id: u64, outcome: Settlement) -> Option<Trade> {
        let index = self
            .open_options
            .iter()
            .position(|t| t.order.id == order_id)?;
        let trade = self.open_options.remove(index);
        match outcome {
            Settlement::Assigned => self.assigned.push(trade.clone()),
            Settlement::Expired => self.expired.push(trade.clone()),
        }
        Some(trade)
    }

    /// Total option trades ever booked (open + settled)
    pub fn option_trade_count(&self) -> usize {
        self.open_options.len() + self.assigned.len() + self.expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Instrument, OptionContract, OptionRight, Order, Side, Trade};
    use chrono::NaiveDate;

    fn spy_call(strike: i64) -> OptionContract {
        OptionContract::expiring_on(
            "SPY",
            OptionRight::Call,
            NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
            strike,
        )
    }

    fn option_trade(id: u64, side: Side, strike: i64, price: f64, qty: i64) -> Trade {
        let order = Order {
            id,
            side,
            instrument: Instrument::Option(spy_call(strike)),
            limit_price: 0.0,
            qty,
            product: "SPY".to_string(),
        };
        Trade::new(order, price, qty)
    }

    fn stock_trade(id: u64, side: Side, price: f64, qty: i64) -> Trade {
        let order = Order {
            id,
            side,
            instrument: Instrument::Stock("SPY".to_string()),
            limit_price: price,
            qty,
            product: "SPY".to_string(),
        };
        Trade::new(order, price, qty)
    }

    #[test]
    fn test_apply_buy_and_sell() {
        let mut ledger = PositionLedger::new(10_000.0);
        let instrument = Instrument::Stock("SPY".to_string());

        ledger.apply(&stock_trade(1, Side::Buy, 50.0, 100));
        assert_eq!(ledger.cash(), 5_000.0);
        assert_eq!(ledger.position(&instrument), 100);

        ledger.apply(&stock_trade(2, Side::Sell, 60.0, 100));
        assert_eq!(ledger.cash(), 11_000.0);
        assert_eq!(ledger.position(&instrument), 0);
    }

    #[test]
    fn test_zero_entry_invariant() {
        let mut ledger = PositionLedger::new(0.0);
        let instrument = Instrument::Stock("SPY".to_string());

        ledger.add_position(instrument.clone(), 5);
        ledger.add_position(instrument.clone(), -5);
        assert!(!ledger.positions().contains_key(&instrument));
        assert!(ledger.positions().is_empty());
    }

    #[test]
    fn test_option_premium_tracking() {
        let mut ledger = PositionLedger::new(0.0);

        // sell 1 contract at $1.25: collect $125
        ledger.apply(&option_trade(1, Side::Sell, 100, 1.25, 1));
        assert_eq!(ledger.option_premium_net(), 125.0);
        assert_eq!(ledger.cash(), 125.0);

        // buy 1 contract at $0.75: pay $75
        ledger.apply(&option_trade(2, Side::Buy, 105, 0.75, 1));
        assert_eq!(ledger.option_premium_net(), 50.0);

        // stock trades never touch the premium total
        ledger.apply(&stock_trade(3, Side::Buy, 10.0, 1));
        assert_eq!(ledger.option_premium_net(), 50.0);
    }

    #[test]
    fn test_positions_match_summed_trades() {
        let mut ledger = PositionLedger::new(0.0);
        let trades = vec![
            option_trade(1, Side::Sell, 100, 1.0, 2),
            option_trade(2, Side::Buy, 100, 1.0, 1),
            stock_trade(3, Side::Buy, 10.0, 30),
        ];
        for trade in &trades {
            ledger.apply(trade);
        }

        let option = Instrument::Option(spy_call(100));
        let stock = Instrument::Stock("SPY".to_string());
        assert_eq!(ledger.position(&option), -1);
        assert_eq!(ledger.position(&stock), 30);
    }

    #[test]
    fn test_trade_book_lifecycle() {
        let mut book = TradeBook::new();
        book.record_fill(&option_trade(1, Side::Sell, 100, 1.0, 1));
        book.record_fill(&option_trade(2, Side::Sell, 105, 0.5, 1));
        book.record_fill(&stock_trade(3, Side::Buy, 10.0, 1));

        // stock trades carry no lifecycle state
        assert_eq!(book.open_options.len(), 2);
        assert_eq!(book.fills.len(), 3);

        assert!(book.settle(1, Settlement::Assigned).is_some());
        assert!(book.settle(2, Settlement::Expired).is_some());
        assert!(book.settle(2, Settlement::Expired).is_none());

        assert!(book.open_options.is_empty());
        assert_eq!(book.assigned.len(), 1);
        assert_eq!(book.expired.len(), 1);
        assert_eq!(book.option_trade_count(), 2);
    }
}
