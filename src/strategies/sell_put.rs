//! Pure short-put income: sell puts daily, dump assigned stock immediately

use crate::context::StrategyContext;
use crate::error::EngineResult;
use crate::strategies::strike_at_offset;
use crate::types::{OptionRight, Side, StrategyMetadata};
use crate::Strategy;
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};

/// Sells one OTM put per day. Stock picked up through assignment is sold
/// again at the market as soon as possible.
pub struct SellPut {
    put_otm_pct: f64,
    dte: i64,
    strike_step: i64,
}

impl SellPut {
    pub fn new(put_otm_pct: f64, dte: i64) -> Self {
        Self {
            put_otm_pct,
            dte,
            strike_step: 5,
        }
    }
}

#[async_trait]
impl Strategy for SellPut {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: format!("sell-put-{}dte", self.dte),
            description: "sell OTM puts daily, exit assigned stock immediately".to_string(),
        }
    }

    async fn on_tick(
        &mut self,
        time: DateTime<Utc>,
        spot: f64,
        ctx: &mut StrategyContext,
    ) -> EngineResult<()> {
        if ctx.holding_stock() {
            // exit the assigned stock position asap
            if ctx.pending_orders.is_empty() {
                let qty = ctx.stock_position();
                assert!(qty > 0, "holding_stock implies a positive position");
                ctx.send_stock_order(Side::Sell, spot, qty);
            }
        } else if time.hour() >= 10 && !ctx.has_open_option_trades() {
            let strike = strike_at_offset(spot, -self.put_otm_pct, self.strike_step);
            ctx.send_option_order(Side::Sell, OptionRight::Put, self.dte, strike, 1);
        }
        Ok(())
    }
}
