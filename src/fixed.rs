// 2.0: checked fixed-point arithmetic. every monetary/ratio product or quotient in
// the engine goes through here so the rounding policy lives in exactly one place:
// truncation toward zero at 18 fractional digits. no banker's rounding anywhere.
//
// overflow and division by zero are caller bugs for well-formed inputs; they
// surface as MathError and the enclosing operation makes no state change.

use rust_decimal::Decimal;
use thiserror::Error;

/// Fractional digits carried by every fixed-point quantity.
pub const DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// `a * b`, truncated toward zero at 18 fractional digits.
pub fn mul_decimal(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product.trunc_with_scale(DECIMALS))
}

/// `a / b`, truncated toward zero at 18 fractional digits.
pub fn div_decimal(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(MathError::Overflow)?;
    Ok(quotient.trunc_with_scale(DECIMALS))
}

/// Saturate `x` into `[lo, hi]`. funding-rate caps use this.
pub fn clamp(lo: Decimal, hi: Decimal, x: Decimal) -> Decimal {
    debug_assert!(lo <= hi);
    x.max(lo).min(hi)
}
