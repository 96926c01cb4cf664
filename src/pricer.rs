//! Option pricing: Black-Scholes-Merton plus a historical volatility
//! estimator with an OTM skew term
//!
//! The pricer prefers an observed market trade price when one exists in the
//! ingested history and falls back to the theoretical value otherwise.

use crate::config::PricerConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{OptionContract, OptionQuote, Tick};
use chrono::{DateTime, Duration, Utc};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
pub const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Trailing history retention
const HISTORY_RETENTION_DAYS: i64 = 365;

/// Volatility lookback never shrinks below one week
const MIN_LOOKBACK_DAYS: f64 = 7.0;

/// A live contract never prices below one cent
const MIN_PRICE: f64 = 0.01;

/// Sigma floor guarding against a degenerate flat-history window
const MIN_SIGMA: f64 = 1e-4;

/// Round a price to the nearest cent
pub fn round_to_cent(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Theoretical option pricer with a bounded tick-history buffer
pub struct Pricer {
    config: PricerConfig,
    /// Current mark: (time, spot), set once per tick via `update`
    mark: Option<(DateTime<Utc>, f64)>,
    history: VecDeque<Tick>,
    /// Latest observed quote per contract symbol (carry-forward cache)
    quote_cache: HashMap<String, OptionQuote>,
}

impl Pricer {
    pub fn new(config: PricerConfig) -> Self {
        Self {
            config,
            mark: None,
            history: VecDeque::new(),
            quote_cache: HashMap::new(),
        }
    }

    /// Record the current mark for the day.
    ///
    /// Must be called once per tick before any pricing.
    pub fn update(&mut self, time: DateTime<Utc>, spot: f64) {
        self.mark = Some((time, spot));
    }

    /// Append a full tick to the trailing history buffer.
    ///
    /// Entries older than the retention window are evicted after every append
    /// to bound memory over long replays.
    pub fn ingest(&mut self, tick: &Tick) {
        for (symbol, quote) in &tick.quotes {
            if quote.time == tick.time && quote.is_crossed() {
                warn!(
                    time = %tick.time,
                    %symbol,
                    bid = quote.bid,
                    ask = quote.ask,
                    "crossed or zero-width quote"
                );
            }
            self.quote_cache.insert(symbol.clone(), quote.clone());
        }

        self.history.push_back(tick.clone());
        let cutoff = tick.time - Duration::days(HISTORY_RETENTION_DAYS);
        while self
            .history
            .front()
            .is_some_and(|front| front.time < cutoff)
        {
            self.history.pop_front();
        }
    }

    /// Last observed market trade price for the contract, else theoretical
    pub fn market_price_or_theoretical(&self, option: &OptionContract) -> EngineResult<f64> {
        if let Some(quote) = self.quote_cache.get(&option.symbol()) {
            if quote.last > 0.0 {
                return Ok(quote.last);
            }
        }
        self.theoretical_price(option)
    }

    /// Closed-form BSM value of a European option at the current mark.
    ///
    /// Returns 0 for an already-expired contract; otherwise the result is
    /// rounded to the nearest cent and floored at one cent.
    pub fn theoretical_price(&self, option: &OptionContract) -> EngineResult<f64> {
        let (now, spot) = self
            .mark
            .ok_or_else(|| EngineError::NoMark(option.symbol()))?;

        // must short-circuit before any logarithm/division below
        let tte_secs = (option.expiration - now).num_seconds();
        if tte_secs <= 0 {
            return Ok(0.0);
        }
        let t = tte_secs as f64 / SECONDS_PER_YEAR as f64;

        let sigma = self.estimate_volatility(option, now, spot).max(MIN_SIGMA);
        let price = bsm_price(
            option,
            spot,
            t,
            sigma,
            self.config.risk_free_rate,
        )?;
        Ok(round_to_cent(price).max(MIN_PRICE))
    }

    /// Annualized volatility from trailing close-to-close log returns.
    ///
    /// Lookback is max(7 days, time to expiry). With fewer than the minimum
    /// sample count the fixed default volatility is returned. A deterministic
    /// skew term raises the estimate for contracts further out of the money
    /// and closer to expiration.
    fn estimate_volatility(&self, option: &OptionContract, now: DateTime<Utc>, spot: f64) -> f64 {
        let tte_days = (option.expiration - now).num_seconds() as f64 / SECONDS_PER_DAY as f64;
        let lookback_days = tte_days.max(MIN_LOOKBACK_DAYS);
        let cutoff = now - Duration::seconds((lookback_days * SECONDS_PER_DAY as f64) as i64);

        let samples: Vec<(DateTime<Utc>, f64)> = self
            .history
            .iter()
            .filter(|tick| tick.time >= cutoff)
            .filter_map(|tick| tick.bar.as_ref().map(|bar| (tick.time, bar.close)))
            .filter(|(_, close)| *close > 0.0)
            .collect();
        if samples.len() < self.config.min_vol_samples {
            return self.config.default_volatility;
        }

        let returns: Vec<f64> = samples
            .windows(2)
            .map(|w| (w[1].1 / w[0].1).ln())
            .collect();
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

        let span_secs = (samples[samples.len() - 1].0 - samples[0].0).num_seconds() as f64;
        let avg_dt_secs = span_secs / (samples.len() - 1) as f64;
        if avg_dt_secs <= 0.0 {
            return self.config.default_volatility;
        }
        let annualized = variance.sqrt() * (SECONDS_PER_YEAR as f64 / avg_dt_secs).sqrt();

        // structural skew: more OTM and more near-dated means richer vol
        let otm_fraction = (option.strike as f64 - spot).abs() / spot;
        annualized + otm_fraction * (1.0 + 3.0 / tte_days)
    }
}

/// Black-Scholes-Merton price for a European call or put
fn bsm_price(
    option: &OptionContract,
    spot: f64,
    t: f64,
    sigma: f64,
    rate: f64,
) -> EngineResult<f64> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| EngineError::PricingError(e.to_string()))?;

    let s = spot;
    let k = option.strike as f64;
    let d1 = ((s / k).ln() + (rate + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    let d2 = d1 - sigma * t.sqrt();

    let price = if option.is_call() {
        s * normal.cdf(d1) - k * (-rate * t).exp() * normal.cdf(d2)
    } else {
        k * (-rate * t).exp() * normal.cdf(-d2) - s * normal.cdf(-d1)
    };
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OptionRight, StockBar};
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn contract(right: OptionRight, expiration: DateTime<Utc>, strike: i64) -> OptionContract {
        OptionContract {
            product: "SPY".to_string(),
            right,
            expiration,
            strike,
        }
    }

    fn bar_tick(time: DateTime<Utc>, close: f64) -> Tick {
        Tick {
            time,
            bar: Some(StockBar {
                time,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
            }),
            quotes: HashMap::new(),
        }
    }

    #[test]
    fn test_expired_contract_prices_at_zero() {
        let now = Utc.with_ymd_and_hms(2025, 7, 18, 17, 0, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);

        let expired = contract(
            OptionRight::Call,
            Utc.with_ymd_and_hms(2025, 7, 18, 16, 30, 0).unwrap(),
            90,
        );
        assert_eq!(pricer.theoretical_price(&expired).unwrap(), 0.0);
    }

    #[test]
    fn test_volatility_fallback_with_thin_history() {
        let now = Utc.with_ymd_and_hms(2025, 7, 14, 10, 0, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);
        // 3 samples, below the 10-sample minimum
        for i in 0..3 {
            pricer.ingest(&bar_tick(now - Duration::hours(3 - i), 100.0 + i as f64));
        }

        let atm = contract(
            OptionRight::Call,
            Utc.with_ymd_and_hms(2025, 7, 21, 16, 30, 0).unwrap(),
            100,
        );
        let vol = pricer.estimate_volatility(&atm, now, 100.0);
        assert_eq!(vol, PricerConfig::default().default_volatility);
    }

    #[test]
    fn test_volatility_estimated_from_history_with_skew() {
        let now = Utc.with_ymd_and_hms(2025, 7, 14, 10, 0, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);
        for i in 0..20 {
            let close = if i % 2 == 0 { 100.0 } else { 101.0 };
            pricer.ingest(&bar_tick(now - Duration::minutes(15 * (20 - i)), close));
        }

        let expiration = Utc.with_ymd_and_hms(2025, 7, 21, 16, 30, 0).unwrap();
        let atm = contract(OptionRight::Call, expiration, 100);
        let otm = contract(OptionRight::Call, expiration, 105);

        let atm_vol = pricer.estimate_volatility(&atm, now, 100.0);
        let otm_vol = pricer.estimate_volatility(&otm, now, 100.0);
        assert!(atm_vol.is_finite() && atm_vol > 0.0);
        assert_ne!(atm_vol, PricerConfig::default().default_volatility);
        // skew raises the OTM estimate
        assert!(otm_vol > atm_vol);
    }

    #[test]
    fn test_deep_itm_call_converges_to_intrinsic() {
        let now = Utc.with_ymd_and_hms(2025, 7, 18, 15, 30, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);

        // one hour to expiry, struck far below spot
        let call = contract(
            OptionRight::Call,
            Utc.with_ymd_and_hms(2025, 7, 18, 16, 30, 0).unwrap(),
            50,
        );
        let price = pricer.theoretical_price(&call).unwrap();
        assert_abs_diff_eq!(price, 50.0, epsilon = 0.02);
    }

    #[test]
    fn test_deep_itm_put_converges_to_intrinsic() {
        let now = Utc.with_ymd_and_hms(2025, 7, 18, 15, 30, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);

        let put = contract(
            OptionRight::Put,
            Utc.with_ymd_and_hms(2025, 7, 18, 16, 30, 0).unwrap(),
            150,
        );
        let price = pricer.theoretical_price(&put).unwrap();
        assert_abs_diff_eq!(price, 50.0, epsilon = 0.02);
    }

    #[test]
    fn test_far_otm_floors_at_one_cent() {
        let now = Utc.with_ymd_and_hms(2025, 7, 18, 10, 0, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);

        let call = contract(
            OptionRight::Call,
            Utc.with_ymd_and_hms(2025, 7, 18, 16, 30, 0).unwrap(),
            200,
        );
        // worthless but live contracts never price at exactly zero
        assert_eq!(pricer.theoretical_price(&call).unwrap(), 0.01);
    }

    #[test]
    fn test_market_price_preferred_over_theoretical() {
        let now = Utc.with_ymd_and_hms(2025, 7, 14, 10, 0, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        pricer.update(now, 100.0);

        let call = contract(
            OptionRight::Call,
            Utc.with_ymd_and_hms(2025, 7, 18, 16, 30, 0).unwrap(),
            105,
        );
        let mut tick = bar_tick(now, 100.0);
        tick.quotes.insert(
            call.symbol(),
            OptionQuote {
                time: now,
                bid: 1.20,
                ask: 1.30,
                last: 1.25,
                implied_vol: 0.18,
                volume: 42,
            },
        );
        pricer.ingest(&tick);

        assert_eq!(pricer.market_price_or_theoretical(&call).unwrap(), 1.25);
    }

    #[test]
    fn test_history_eviction_bounds_buffer() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut pricer = Pricer::new(PricerConfig::default());
        for day in 0..400 {
            pricer.ingest(&bar_tick(start + Duration::days(day), 100.0));
        }
        // only the trailing 365 days survive
        assert!(pricer.history.len() <= 366);
        let oldest = pricer.history.front().unwrap().time;
        let newest = pricer.history.back().unwrap().time;
        assert!(newest - oldest <= Duration::days(365));
    }

    #[test]
    fn test_pricing_without_mark_is_an_error() {
        let pricer = Pricer::new(PricerConfig::default());
        let call = contract(OptionRight::Call, Utc::now(), 100);
        assert!(matches!(
            pricer.theoretical_price(&call),
            Err(EngineError::NoMark(_))
        ));
    }
}
