//! Buy-and-hold benchmark

use crate::context::StrategyContext;
use crate::error::EngineResult;
use crate::types::{Side, StrategyMetadata};
use crate::Strategy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Buys as much stock as cash allows and holds it for the whole run.
/// Useful as a baseline to compare option strategies against.
pub struct HoldStock;

#[async_trait]
impl Strategy for HoldStock {
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "hold-stock".to_string(),
            description: "buy-and-hold benchmark".to_string(),
        }
    }

    async fn on_tick(
        &mut self,
        _time: DateTime<Utc>,
        spot: f64,
        ctx: &mut StrategyContext,
    ) -> EngineResult<()> {
        if !ctx.holding_stock() && ctx.pending_orders.is_empty() {
            let max_qty = (ctx.cash() / spot).floor() as i64;
            if max_qty > 0 {
                ctx.send_stock_order(Side::Buy, spot, max_qty);
            }
        }
        Ok(())
    }
}
