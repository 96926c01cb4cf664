//! Backtest configuration

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};

/// Pricer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricerConfig {
    /// Annualized risk-free rate used in the BSM formula
    pub risk_free_rate: f64,

    /// Fallback volatility when history is too thin to estimate one
    pub default_volatility: f64,

    /// Minimum close samples required for a historical estimate
    pub min_vol_samples: usize,
}

impl Default for PricerConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            default_volatility: 0.15,
            min_vol_samples: 10,
        }
    }
}

/// Backtesting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting cash in USD
    pub initial_cash: f64,

    /// Product symbol the run trades
    pub product: String,

    /// Pricer configuration
    #[serde(default)]
    pub pricer: PricerConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: 50_000.0,
            product: "SPY".to_string(),
            pricer: PricerConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Load a configuration from YAML
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
