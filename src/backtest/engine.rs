//! Backtesting engine: the tick loop

use crate::backtest::{matching, settlement};
use crate::config::BacktestConfig;
use crate::context::StrategyContext;
use crate::error::EngineResult;
use crate::feed::TickMerger;
use crate::pricer::{round_to_cent, Pricer};
use crate::types::ValuationPoint;
use crate::Strategy;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Backtesting result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Strategy name
    pub strategy: String,

    /// Ticks replayed from the feed
    pub ticks_replayed: u64,

    /// Final net asset value
    pub final_nav: f64,

    /// Total return (absolute)
    pub total_return: f64,

    /// Total return (percentage)
    pub total_return_pct: f64,

    /// Daily valuation series, one entry per trading day
    pub valuations: Vec<ValuationPoint>,

    /// Number of fills
    pub num_trades: usize,

    /// Option trades exercised against the book
    pub num_assigned: usize,

    /// Option trades that expired worthless
    pub num_expired: usize,
}

/// Event-driven backtesting engine
///
/// Replays a merged tick feed against one strategy: price update, strategy
/// tick, order matching, history ingest, and (on day boundaries) settlement,
/// strictly in that order within each tick.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Run the backtest to feed exhaustion
    pub async fn run(
        &self,
        strategy: &mut dyn Strategy,
        mut feed: TickMerger,
    ) -> EngineResult<BacktestReport> {
        let name = strategy.metadata().name;
        let mut ctx = StrategyContext::new(name.clone(), &self.config);
        let mut pricer = Pricer::new(self.config.pricer.clone());
        info!(strategy = %name, initial_cash = self.config.initial_cash, "backtest starting");

        while let Some(tick) = feed.next() {
            if let Some(bar) = tick.bar.clone() {
                // feed the latest mark to the pricer and the strategy
                pricer.update(tick.time, bar.open);
                ctx.set_mark(tick.time, bar.open);
                strategy.on_tick(tick.time, bar.open, &mut ctx).await?;

                let trades = matching::match_orders(&mut ctx, &tick, &pricer)?;
                for trade in trades {
                    info!(
                        time = %tick.time,
                        order_id = trade.order.id,
                        price = trade.price,
                        qty = trade.qty,
                        "order filled"
                    );
                    ctx.ledger.apply(&trade);
                    ctx.book.record_fill(&trade);
                    strategy.on_fill(&trade, &mut ctx).await?;
                }
            }

            // full tick (with quotes) joins the pricing history
            pricer.ingest(&tick);

            if feed.is_end_of_day(tick.time) {
                if let Some(bar) = tick.bar.as_ref() {
                    settlement::settle_day(strategy, &mut ctx, bar).await?;
                    log_day_stats(&ctx);
                }
            }
        }

        info!(strategy = %name, ticks = feed.tick_count(), "backtest finished");
        Ok(self.build_report(name, feed.tick_count(), ctx))
    }

    fn build_report(&self, strategy: String, ticks: u64, ctx: StrategyContext) -> BacktestReport {
        let final_nav = ctx
            .valuations
            .last()
            .map(|point| point.nav)
            .unwrap_or(self.config.initial_cash);
        let total_return = final_nav - self.config.initial_cash;
        BacktestReport {
            strategy,
            ticks_replayed: ticks,
            final_nav,
            total_return,
            total_return_pct: total_return / self.config.initial_cash * 100.0,
            num_trades: ctx.book.fills.len(),
            num_assigned: ctx.book.assigned.len(),
            num_expired: ctx.book.expired.len(),
            valuations: ctx.valuations,
        }
    }
}

/// End-of-day stats line, mirroring the per-day strategy summary
fn log_day_stats(ctx: &StrategyContext) {
    let option_trades = ctx.book.option_trade_count();
    let avg_premium = if option_trades == 0 {
        0.0
    } else {
        round_to_cent(ctx.ledger.option_premium_net() / option_trades as f64)
    };
    info!(
        time = %ctx.time(),
        open = ctx.book.open_options.len(),
        assigned = ctx.book.assigned.len(),
        expired = ctx.book.expired.len(),
        avg_premium,
        cash = round_to_cent(ctx.ledger.cash()),
        positions = ?ctx.ledger.positions(),
        "day stats"
    );
}
