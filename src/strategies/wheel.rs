//! The wheel: sell puts until assigned stock, then sell calls against it

use crate::context::StrategyContext;
use crate::error::EngineResult;
use crate::strategies::strike_at_offset;
use crate::types::{OptionRight, Side, StrategyMetadata};
use crate::Strategy;
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};

/// Classic wheel strategy.
///
/// Holds at most one open option trade. While flat it sells an OTM put;
/// while holding assigned stock it sells an OTM call. Entries only happen
/// from 10:00 onward, after the opening range has settled.
pub struct Wheel {
    put_otm_pct: f64,
    call_otm_pct: f64,
    dte: i64,
    strike_step: i64,
}

impl Wheel {
    pub fn new(put_otm_pct: f64, call_otm_pct: f64, dte: i64) -> Self {
        Self {
            put_otm_pct,
            call_otm_pct,
            dte,
            strike_step: 5,
        }
    }
}

#[async_trait]
impl Strategy for Wheel {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: format!("wheel-{}dte", self.dte),
            description: "sell puts until assigned, then sell covered calls".to_string(),
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
        } else {
            let strike = strike_at_offset(spot, -self.put_otm_pct, self.strike_step);
            ctx.send_option_order(Side::Sell, OptionRight::Put, self.dte, strike, 1);
        }
        Ok(())
    }
}
