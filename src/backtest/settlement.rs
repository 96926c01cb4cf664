//! End-of-day settlement: assignment and expiration
//!
//! Fires exactly once per trading day on the end-of-day tick. Every open
//! option trade whose contract has reached expiration resolves to a terminal
//! state; nothing may stay open past its expiration date.

use crate::context::StrategyContext;
use crate::error::{EngineError, EngineResult};
use crate::types::{
    Instrument, OptionContract, OptionRight, Settlement, Side, StockBar, Trade, OPTION_MULTIPLIER,
};
use crate::Strategy;
use tracing::info;

/// Settle all option trades due on or before the current date, then record
/// the day's valuation snapshot.
pub async fn settle_day(
    strategy: &mut dyn Strategy,
    ctx: &mut StrategyContext,
    bar: &StockBar,
) -> EngineResult<()> {
    let today = ctx.time().date_naive();
    let close = bar.close;

    // <= rather than ==: a missed session must never leave a trade open past
    // expiration
    let due: Vec<Trade> = ctx
        .book
        .open_options
        .iter()
        .filter(|trade| {
            contract_of(trade).expiration.date_naive() <= today
        })
        .cloned()
        .collect();

    let mut expired = Vec::new();
    for trade in due {
        let contract = contract_of(&trade).clone();
        let itm = match contract.right {
            OptionRight::Call => close >= contract.strike as f64,
            OptionRight::Put => close <= contract.strike as f64,
        };
        if itm {
            assign(strategy, ctx, &trade, &contract, close).await?;
        } else {
            expire(ctx, &trade, &contract);
            expired.push(trade);
        }
    }

    // hard invariant sweep
    if let Some(stale) = ctx
        .book
        .open_options
        .iter()
        .find(|trade| contract_of(trade).expiration.date_naive() <= today)
    {
        return Err(EngineError::UnsettledExpiredTrade {
            order_id: stale.order.id,
            time: ctx.time(),
        });
    }

    strategy.on_close(&expired, ctx).await?;
    ctx.record_valuation(close);
    Ok(())
}

/// Exercise an in-the-money short option against the book.
///
/// Assigning a bought option is a contract violation: exercise of a long
/// position is a strategy decision, not a settlement outcome this engine
/// models, so hitting one here is an implementation bug.
async fn assign(
    strategy: &mut dyn Strategy,
    ctx: &mut StrategyContext,
    trade: &Trade,
    contract: &OptionContract,
    close: f64,
) -> EngineResult<()> {
    if trade.order.side == Side::Buy {
        return Err(EngineError::AssignedBoughtOption {
            order_id: trade.order.id,
            time: ctx.time(),
        });
    }

    ctx.book.settle(trade.order.id, Settlement::Assigned);
    // the short option position closes alongside the exercise
    ctx.ledger
        .add_position(Instrument::Option(contract.clone()), trade.qty);

    let shares = trade.qty * OPTION_MULTIPLIER;
    let strike_cash = (contract.strike * shares) as f64;
    let stock = Instrument::Stock(trade.order.product.clone());
    if contract.is_call() {
        // called away: deliver stock, receive strike
        ctx.ledger.add_position(stock, -shares);
        ctx.ledger.adjust_cash(strike_cash);
    } else {
        // put to us: receive stock, pay strike
        ctx.ledger.add_position(stock, shares);
        ctx.ledger.adjust_cash(-strike_cash);
    }

    info!(
        time = %ctx.time(),
        contract = %contract,
        order_id = trade.order.id,
        spot = close,
        "option assigned"
    );
    strategy.on_assignment(trade, close, ctx).await
}

/// Reverse an out-of-the-money option position with no cash effect
fn expire(ctx: &mut StrategyContext, trade: &Trade, contract: &OptionContract) {
    let qty = match trade.order.side {
        Side::Buy => -trade.qty,
        Side::Sell => trade.qty,
    };
    ctx.ledger
        .add_position(Instrument::Option(contract.clone()), qty);
    ctx.book.settle(trade.order.id, Settlement::Expired);
    info!(
        time = %ctx.time(),
        contract = %contract,
        order_id = trade.order.id,
        "option expired worthless"
    );
}

fn contract_of(trade: &Trade) -> &OptionContract {
    trade
        .order
        .instrument
        .as_option()
        .expect("open option trade must hold an option contract")
}
