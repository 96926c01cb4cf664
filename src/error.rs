//! Error types for the backtesting engine

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for engine operations
///
/// Contract violations are implementation bugs surfacing as errors: the run
/// aborts with the offending order/trade id and simulation time rather than
/// silently recovering.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An in-the-money settlement hit a bought option
    #[error("contract violation at {time}: assignment of a bought option (order id={order_id})")]
    AssignedBoughtOption {
        order_id: u64,
        time: DateTime<Utc>,
    },

    /// An option trade survived past its expiration date without settling
    #[error("contract violation at {time}: option trade still open past expiration (order id={order_id})")]
    UnsettledExpiredTrade {
        order_id: u64,
        time: DateTime<Utc>,
    },

    /// Pricing requested before any mark was recorded
    #[error("pricer has no mark: {0}")]
    NoMark(String),

    /// Numerical failure inside the pricing formula
    #[error("pricing error: {0}")]
    PricingError(String),

    /// Feed produced out-of-order or otherwise unusable data
    #[error("feed error: {0}")]
    FeedError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Strategy callback failure
    #[error("strategy error: {0}")]
    StrategyError(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
