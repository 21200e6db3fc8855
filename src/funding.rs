// 6.0: the funding engine. funding is a lazy pull: the instantaneous rate is a
// function of skew, and accrual only hits storage when a recompute appends to the
// market's funding sequence. a position's owed funding since its last touch is
// (sequence[now] - sequence[last_index]) * size, in quote units.
//
// sign convention: positive skew (net long) => negative rate, longs pay shorts.

use crate::fixed::{clamp, div_decimal, mul_decimal, MathError};
use crate::ledger::MarketLedger;
use crate::params::MarketParams;
use crate::types::{Price, Quote, SignedSize, Timestamp};
use rust_decimal::Decimal;

// 6.1: skew normalized by skew_scale_usd, saturated to [-1, 1]. a market more
// one-sided than its scale pins funding at the cap instead of erroring.
pub fn proportional_skew(
    market_skew: Decimal,
    price: Price,
    params: &MarketParams,
) -> Result<Decimal, MathError> {
    let notional_skew = mul_decimal(market_skew, price.value())?;
    let p_skew = div_decimal(notional_skew, params.skew_scale_usd)?;
    Ok(clamp(-Decimal::ONE, Decimal::ONE, p_skew))
}

// 6.2: the instantaneous rate per day, capped at +/- max_funding_rate.
// zero skew always yields a zero rate.
pub fn current_funding_rate_per_day(
    market_skew: Decimal,
    price: Price,
    params: &MarketParams,
) -> Result<Decimal, MathError> {
    let p_skew = proportional_skew(market_skew, price, params)?;
    let rate = mul_decimal(-p_skew, params.max_funding_rate)?;
    Ok(clamp(-params.max_funding_rate, params.max_funding_rate, rate))
}

// 6.3: funding accrued per unit of position size since the last recompute,
// in quote units, evaluated at the current price.
pub fn unrecorded_funding(
    market_skew: Decimal,
    price: Price,
    last_recomputed: Timestamp,
    now: Timestamp,
    params: &MarketParams,
) -> Result<Decimal, MathError> {
    let rate = current_funding_rate_per_day(market_skew, price, params)?;
    let elapsed_days = last_recomputed.elapsed_days(&now);
    mul_decimal(mul_decimal(rate, price.value())?, elapsed_days)
}

/// The value the next funding-sequence entry would carry if recomputed `now`.
pub fn next_funding_entry(
    ledger: &MarketLedger,
    price: Price,
    now: Timestamp,
    params: &MarketParams,
) -> Result<Decimal, MathError> {
    let unrecorded = unrecorded_funding(
        ledger.market_skew,
        price,
        ledger.funding_last_recomputed,
        now,
        params,
    )?;
    Ok(ledger.latest_funding() + unrecorded)
}

// 6.4: per-position accrual between two points of the cumulative sequence.
pub fn accrued_funding(
    size: SignedSize,
    entry_funding: Decimal,
    current_funding: Decimal,
) -> Result<Quote, MathError> {
    let delta = current_funding - entry_funding;
    Ok(Quote::new(mul_decimal(size.value(), delta)?))
}
