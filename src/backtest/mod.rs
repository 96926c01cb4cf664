//! Event-driven backtesting: tick loop, order matching, and end-of-day
//! settlement

pub mod engine;
pub mod matching;
pub mod settlement;

pub use engine::{BacktestEngine, BacktestReport};
