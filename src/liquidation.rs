// 8.0: liquidation math. a position is liquidatable when its remaining margin
// falls to or below the liquidation margin: keeper fee (floored) plus a buffer
// proportional to notional. all pure; the engine owns the mutation.

use crate::fixed::{div_decimal, mul_decimal, MathError};
use crate::ledger::Position;
use crate::margin::{margin_plus_profit_funding, remaining_margin};
use crate::params::GlobalParams;
use crate::types::{Price, Quote};
use rust_decimal::Decimal;

// 8.1: max(min_keeper_fee, notional * fee_ratio) + notional * buffer_ratio.
// callers guard size == 0 (a closed position has no liquidation margin).
pub fn liquidation_margin(
    size_abs: Decimal,
    price: Price,
    global: &GlobalParams,
) -> Result<Quote, MathError> {
    let notional = mul_decimal(size_abs, price.value())?;
    let fee = liquidation_fee(size_abs, price, global)?;
    let buffer = mul_decimal(notional, global.liquidation_buffer_ratio)?;
    Ok(Quote::new(fee.value() + buffer))
}

/// Keeper fee for liquidating a position of `size_abs` at `price`.
pub fn liquidation_fee(
    size_abs: Decimal,
    price: Price,
    global: &GlobalParams,
) -> Result<Quote, MathError> {
    let notional = mul_decimal(size_abs, price.value())?;
    let proportional = mul_decimal(notional, global.liquidation_fee_ratio)?;
    Ok(Quote::new(proportional.max(global.min_keeper_fee.value())))
}

/// Liquidation eligibility at a valid current price. false for closed positions.
pub fn can_liquidate(
    position: &Position,
    price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
    global: &GlobalParams,
) -> Result<bool, MathError> {
    if !position.is_open() {
        return Ok(false);
    }
    let remaining = remaining_margin(position, price, entry_funding, current_funding)?;
    let floor = liquidation_margin(position.size.abs(), price, global)?;
    Ok(remaining <= floor)
}

// 8.2: solve remaining == liquidation_margin for price, using the current price's
// margin terms as a linear proxy. the liquidation margin and fee themselves move
// with the solved price, so this is an approximation: it is exact only when the
// current price is the liquidation-triggering price, and drifts when current
// price is far from it.
pub fn approx_liquidation_price(
    position: &Position,
    current_price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
    global: &GlobalParams,
) -> Result<Option<Price>, MathError> {
    if !position.is_open() {
        return Ok(None);
    }

    let liq_margin = liquidation_margin(position.size.abs(), current_price, global)?;
    let accrued = crate::funding::accrued_funding(position.size, entry_funding, current_funding)?;
    let buffer = liq_margin.value() - position.margin.value() - accrued.value();
    let price_delta = div_decimal(buffer, position.size.value())?;

    let solved = position.last_price.value() + price_delta;
    Ok(Price::new(solved))
}

/// Fee a keeper would collect at the approximate liquidation price.
pub fn approx_liquidation_fee(
    position: &Position,
    current_price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
    global: &GlobalParams,
) -> Result<Option<Quote>, MathError> {
    let liq_price =
        approx_liquidation_price(position, current_price, entry_funding, current_funding, global)?;
    match liq_price {
        Some(price) => Ok(Some(liquidation_fee(position.size.abs(), price, global)?)),
        None => Ok(None),
    }
}

/// Signed remaining margin a liquidation settles against.
pub fn liquidation_value(
    position: &Position,
    price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
) -> Result<Quote, MathError> {
    Ok(margin_plus_profit_funding(position, price, entry_funding, current_funding)?
        .clamp_non_negative())
}
