//! Covered call: own the stock, sell calls against it

use crate::context::StrategyContext;
use crate::error::EngineResult;
use crate::strategies::strike_at_offset;
use crate::types::{OptionRight, Side, StrategyMetadata};
use crate::Strategy;
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};

/// Buys stock with all available cash, then sells one OTM call at a time
/// against the holding.
pub struct CoveredCall {
    call_otm_pct: f64,
    dte: i64,
    strike_step: i64,
}

impl CoveredCall {
    pub fn new(call_otm_pct: f64, dte: i64) -> Self {
        Self {
            call_otm_pct,
            dte,
            strike_step: 5,
        }
    }
}

#[async_trait]
impl Strategy for CoveredCall {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: format!("covered-call-{}dte", self.dte),
            description: "hold stock and sell OTM calls against it".to_string(),
        }
    }

    async fn on_tick(
        &mut self,
        time: DateTime<Utc>,
        spot: f64,
        ctx: &mut StrategyContext,
    ) -> EngineResult<()> {
        if time.hour() < 10 || ctx.has_open_option_trades() {
            return Ok(());
        }
        if ctx.holding_stock() {
            let strike = strike_at_offset(spot, self.call_otm_pct, self.strike_step);
            ctx.send_option_order(Side::Sell, OptionRight::Call, self.dte, strike, 1);
        } else if ctx.pending_orders.is_empty() {
            let max_qty = (ctx.cash() / spot).floor() as i64;
            if max_qty > 0 {
                ctx.send_stock_order(Side::Buy, spot, max_qty);
            }
        }
        Ok(())
    }
}
