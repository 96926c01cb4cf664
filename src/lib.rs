//! # wheelhouse: event-driven options strategy backtesting
//!
//! Replays historical market data tick-by-tick to simulate the lifecycle of
//! options and stock trading strategies: merged bar/option-chain ticks,
//! strategy-issued orders, realistic fills, theoretical pricing where no
//! market quote exists, and end-of-day assignment/expiration settlement.
//!
//! ## Core Components
//!
//! - **TickMerger**: merges the bar stream and the option-chain snapshot
//!   stream into one time-ordered tick sequence with carry-forward
//! - **Pricer**: Black-Scholes-Merton with a historical volatility estimator
//!   and OTM skew; prefers observed market prices
//! - **Matching**: per-tick fill rules (options at market, stock at limit)
//! - **PositionLedger / TradeBook**: cash, positions, and option lifecycle
//! - **Settlement**: end-of-day assignment vs. expiration
//! - **Strategy Trait**: the only interface a trading strategy implements
//!
//! ## Example
//!
//! ```rust,no_run
//! use wheelhouse::strategies::Wheel;
//! use wheelhouse::{BacktestConfig, BacktestEngine, EngineError, StockBar, QuoteRow, TickMerger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EngineError> {
//!     // bars and quote rows come from the data-loading collaborator
//!     let bars: Vec<StockBar> = Vec::new();
//!     let rows: Vec<QuoteRow> = Vec::new();
//!
//!     let feed = TickMerger::from_rows(bars, rows);
//!     let engine = BacktestEngine::new(BacktestConfig::default());
//!     let mut strategy = Wheel::new(0.01, 0.01, 1);
//!
//!     let report = engine.run(&mut strategy, feed).await?;
//!     println!("{}: final NAV ${:.2}", report.strategy, report.final_nav);
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod pricer;
pub mod strategies;
pub mod types;

// Re-export main types
pub use backtest::{BacktestEngine, BacktestReport};
pub use config::{BacktestConfig, PricerConfig};
pub use context::StrategyContext;
pub use error::{EngineError, EngineResult};
pub use feed::TickMerger;
pub use ledger::{PositionLedger, TradeBook};
pub use pricer::Pricer;
pub use types::{
    ChainSnapshot, Instrument, OptionContract, OptionQuote, OptionRight, Order, QuoteRow,
    Settlement, Side, StockBar, StrategyMetadata, Tick, Trade, ValuationPoint,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Base trait all strategies implement
///
/// The engine drives these callbacks strictly in tick order; a strategy's
/// only way to act on the market is queuing orders on the context. Every
/// callback other than `on_tick` defaults to a no-op.
#[async_trait]
pub trait Strategy: Send {
    /// Strategy metadata (name used for log and report labeling)
    fn metadata(&self) -> StrategyMetadata;

    /// Called once per tick before order matching.
    ///
    /// This is the decision hook: queue zero or more orders on the context.
    async fn on_tick(
        &mut self,
        time: DateTime<Utc>,
        spot: f64,
        ctx: &mut StrategyContext,
    ) -> EngineResult<()>;

    /// Called once per executed trade, after the ledger was updated
    async fn on_fill(&mut self, _trade: &Trade, _ctx: &mut StrategyContext) -> EngineResult<()> {
        Ok(())
    }

    /// Called once per assigned option trade during end-of-day settlement
    async fn on_assignment(
        &mut self,
        _trade: &Trade,
        _spot_at_close: f64,
        _ctx: &mut StrategyContext,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Called once per day after settlement with the trades that expired
    /// worthless (possibly none)
    async fn on_close(
        &mut self,
        _expired: &[Trade],
        _ctx: &mut StrategyContext,
    ) -> EngineResult<()> {
        Ok(())
    }
}
