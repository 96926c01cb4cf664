//! Built-in strategy implementations
//!
//! Each strategy only decides when to queue orders; fills, settlement, and
//! bookkeeping are the engine's job.

mod covered_call;
mod hold_stock;
mod sell_put;
mod wheel;

pub use covered_call::CoveredCall;
pub use hold_stock::HoldStock;
pub use sell_put::SellPut;
pub use wheel::Wheel;

/// Strike `otm_pct` away from spot, rounded away from the money to a step.
///
/// Positive offsets pick call strikes above spot, negative offsets pick put
/// strikes below it.
pub fn strike_at_offset(spot: f64, otm_pct: f64, step: i64) -> i64 {
    let target = spot * (1.0 + otm_pct);
    let steps = if otm_pct >= 0.0 {
        (target / step as f64).ceil()
    } else {
        (target / step as f64).floor()
    };
    steps as i64 * step
}
