//! Order matching and fill rules
//!
//! Runs once per tick against the strategy's pending-order queue. Option
//! orders always fill in full at the market (or theoretical) price. Stock
//! orders fill at their limit price when it lies inside the bar's range and
//! otherwise stay pending, retried on every subsequent tick.

use crate::context::StrategyContext;
use crate::error::EngineResult;
use crate::pricer::Pricer;
use crate::types::{Instrument, Tick, Trade};
use tracing::info;

/// Drain the pending queue, producing one trade per filled order.
///
/// Unfilled stock orders are put back on the queue unchanged.
pub fn match_orders(
    ctx: &mut StrategyContext,
    tick: &Tick,
    pricer: &Pricer,
) -> EngineResult<Vec<Trade>> {
    let pending = std::mem::take(&mut ctx.pending_orders);
    let mut trades = Vec::new();
    let mut remaining = Vec::new();

    for order in pending {
        info!(time = %tick.time, %order, "matching order");
        match &order.instrument {
            Instrument::Option(contract) => {
                // options fill immediately and never stay pending
                let price = pricer.market_price_or_theoretical(contract)?;
                let qty = order.qty;
                trades.push(Trade::new(order, price, qty));
            }
            Instrument::Stock(_) => {
                let bar = match tick.bar.as_ref() {
                    Some(bar) => bar,
                    None => {
                        remaining.push(order);
                        continue;
                    }
                };
                if order.limit_price >= bar.low && order.limit_price <= bar.high {
                    let price = order.limit_price;
                    let qty = order.qty;
                    trades.push(Trade::new(order, price, qty));
                } else {
                    remaining.push(order);
                }
            }
        }
    }

    ctx.pending_orders = remaining;
    Ok(trades)
}
