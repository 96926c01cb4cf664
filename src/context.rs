//! Simulation context threaded through every strategy callback
//!
//! There is no process-wide mutable state: the current simulation time, the
//! ledger, the trade book, and the pending-order queue all live here and are
//! passed explicitly.

use crate::config::BacktestConfig;
use crate::ledger::{PositionLedger, TradeBook};
use crate::types::{Instrument, OptionContract, OptionRight, Order, Side, ValuationPoint};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Strategy execution context
///
/// Owned by the engine; strategies receive `&mut` access in every callback.
/// The pending-order queue is drained by the matching engine once per tick.
pub struct StrategyContext {
    /// Name of the running strategy (log/report labeling)
    pub strategy_id: String,
    /// Product symbol this run trades
    pub product: String,
    /// Cash and position balances
    pub ledger: PositionLedger,
    /// Fill history and option lifecycle buckets
    pub book: TradeBook,
    /// Orders awaiting the matching engine
    pub pending_orders: Vec<Order>,
    /// Daily valuation history, one entry per trading day
    pub valuations: Vec<ValuationPoint>,
    time: DateTime<Utc>,
    spot: f64,
    next_order_id: u64,
}

impl StrategyContext {
    pub fn new(strategy_id: impl Into<String>, config: &BacktestConfig) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            product: config.product.clone(),
            ledger: PositionLedger::new(config.initial_cash),
            book: TradeBook::new(),
            pending_orders: Vec::new(),
            valuations: Vec::new(),
            time: DateTime::<Utc>::MIN_UTC,
            spot: 0.0,
            next_order_id: 0,
        }
    }

    /// Current simulation time
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Latest underlying mark
    pub fn spot(&self) -> f64 {
        self.spot
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    pub fn position(&self, instrument: &Instrument) -> i64 {
        self.ledger.position(instrument)
    }

    /// Signed stock position in the owning product
    pub fn stock_position(&self) -> i64 {
        self.ledger
            .position(&Instrument::Stock(self.product.clone()))
    }

    pub fn holding_stock(&self) -> bool {
        self.stock_position() > 0
    }

    /// True while any option trade awaits settlement
    pub fn has_open_option_trades(&self) -> bool {
        !self.book.open_options.is_empty()
    }

    /// Queue an option order.
    ///
    /// The contract expires `dte` calendar days from the current simulation
    /// date. Option orders fill at the market (or theoretical) price, so no
    /// limit is taken.
    pub fn send_option_order(
        &mut self,
        side: Side,
        right: OptionRight,
        dte: i64,
        strike: i64,
        qty: i64,
    ) -> u64 {
        let expiration_date = (self.time + Duration::days(dte)).date_naive();
        let contract =
            OptionContract::expiring_on(self.product.clone(), right, expiration_date, strike);
        self.enqueue(side, Instrument::Option(contract), 0.0, qty)
    }

    /// Queue a stock limit order
    pub fn send_stock_order(&mut self, side: Side, limit_price: f64, qty: i64) -> u64 {
        self.enqueue(
            side,
            Instrument::Stock(self.product.clone()),
            limit_price,
            qty,
        )
    }

    /// Withdraw a still-pending order. Returns false if it already left the
    /// queue (filled or never existed).
    pub fn withdraw_order(&mut self, order_id: u64) -> bool {
        let before = self.pending_orders.len();
        self.pending_orders.retain(|o| o.id != order_id);
        self.pending_orders.len() < before
    }

    fn enqueue(&mut self, side: Side, instrument: Instrument, limit_price: f64, qty: i64) -> u64 {
        let order = Order {
            id: self.next_order_id,
            side,
            instrument,
            limit_price,
            qty,
            product: self.product.clone(),
        };
        self.next_order_id += 1;
        debug!(time = %self.time, %order, "order queued");
        let id = order.id;
        self.pending_orders.push(order);
        id
    }

    pub(crate) fn set_mark(&mut self, time: DateTime<Utc>, spot: f64) {
        self.time = time;
        self.spot = spot;
    }

    /// Append the day's valuation snapshot at the closing price
    pub(crate) fn record_valuation(&mut self, close: f64) {
        let stock_value = self.stock_position() as f64 * close;
        let nav = self.ledger.cash() + stock_value;
        self.valuations.push(ValuationPoint {
            time: self.time,
            nav,
            stock_value,
            option_premium: self.ledger.option_premium_net(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_context() -> StrategyContext {
        let mut ctx = StrategyContext::new("test", &BacktestConfig::default());
        ctx.set_mark(Utc.with_ymd_and_hms(2025, 7, 14, 10, 0, 0).unwrap(), 550.0);
        ctx
    }

    #[test]
    fn test_order_ids_increase() {
        let mut ctx = test_context();
        let first = ctx.send_stock_order(Side::Buy, 550.0, 10);
        let second = ctx.send_option_order(Side::Sell, OptionRight::Put, 1, 545, 1);
        assert!(second > first);
        assert_eq!(ctx.pending_orders.len(), 2);
    }

    #[test]
    fn test_option_order_expiration_from_dte() {
        let mut ctx = test_context();
        ctx.send_option_order(Side::Sell, OptionRight::Call, 7, 560, 1);

        let order = &ctx.pending_orders[0];
        let contract = order.instrument.as_option().unwrap();
        assert_eq!(
            contract.expiration,
            Utc.with_ymd_and_hms(2025, 7, 21, 16, 30, 0).unwrap()
        );
        assert_eq!(contract.product, "SPY");
    }

    #[test]
    fn test_withdraw_order() {
        let mut ctx = test_context();
        let id = ctx.send_stock_order(Side::Buy, 550.0, 10);
        assert!(ctx.withdraw_order(id));
        assert!(!ctx.withdraw_order(id));
        assert!(ctx.pending_orders.is_empty());
    }

    #[test]
    fn test_record_valuation() {
        let mut ctx = test_context();
        ctx.ledger
            .add_position(Instrument::Stock("SPY".to_string()), 100);
        ctx.record_valuation(550.0);

        let point = &ctx.valuations[0];
        assert_eq!(point.stock_value, 55_000.0);
        assert_eq!(point.nav, 50_000.0 + 55_000.0);
    }
}
