// 7.0: margin accounting math. everything here is pure: given a position record,
// a price and the current cumulative funding, compute pnl, remaining margin,
// leverage and how much of the margin is withdrawable. the engine applies the
// results; this module never touches storage.

use crate::fixed::{div_decimal, mul_decimal, MathError};
use crate::funding::accrued_funding;
use crate::ledger::Position;
use crate::liquidation::liquidation_margin;
use crate::params::{GlobalParams, MarketParams};
use crate::types::{Price, Quote};
use rust_decimal::Decimal;

// 7.1: paper gains/losses since last touch: size * (price - last_price).
pub fn profit_loss(position: &Position, price: Price) -> Result<Quote, MathError> {
    let delta = price.value() - position.last_price.value();
    Ok(Quote::new(mul_decimal(position.size.value(), delta)?))
}

/// Margin + pnl + accrued funding, signed. `entry_funding` is the sequence value
/// at the position's back-reference index, resolved by the caller. negative means
/// underwater beyond collateral; decision logic uses the floored variant below.
pub fn margin_plus_profit_funding(
    position: &Position,
    price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
) -> Result<Quote, MathError> {
    let pnl = profit_loss(position, price)?;
    let funding = accrued_funding(position.size, entry_funding, current_funding)?;
    Ok(position.margin.add(pnl).add(funding))
}

/// Remaining margin floored at zero. leverage and liquidation decisions use this.
pub fn remaining_margin(
    position: &Position,
    price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
) -> Result<Quote, MathError> {
    Ok(
        margin_plus_profit_funding(position, price, entry_funding, current_funding)?
            .clamp_non_negative(),
    )
}

pub fn notional(size_abs: Decimal, price: Price) -> Result<Quote, MathError> {
    Ok(Quote::new(mul_decimal(size_abs, price.value())?))
}

/// Current leverage = notional / remaining margin. a position with no margin
/// left reads as infinitely levered.
pub fn current_leverage(
    size_abs: Decimal,
    price: Price,
    remaining: Quote,
) -> Result<Decimal, MathError> {
    if remaining.is_zero() {
        return Ok(Decimal::MAX);
    }
    div_decimal(notional(size_abs, price)?.value(), remaining.value())
}

// 7.2: the portion of remaining margin withdrawable without breaching the larger
// of min-initial-margin, the max-leverage requirement, or the liquidation margin.
// closed form over the leverage formula, no iteration.
pub fn accessible_margin(
    position: &Position,
    price: Price,
    entry_funding: Decimal,
    current_funding: Decimal,
    market_params: &MarketParams,
    global: &GlobalParams,
) -> Result<Quote, MathError> {
    let remaining = remaining_margin(position, price, entry_funding, current_funding)?;

    let required = if position.is_open() {
        let notional = notional(position.size.abs(), price)?;
        let leverage_floor = div_decimal(notional.value(), market_params.max_leverage)?;
        let liq_floor = liquidation_margin(position.size.abs(), price, global)?;
        global
            .min_initial_margin
            .value()
            .max(leverage_floor)
            .max(liq_floor.value())
    } else {
        Decimal::ZERO
    };

    let accessible = Quote::new(remaining.value() - required).clamp_non_negative();

    // locked margin is never withdrawable regardless of headroom. the cap is
    // taken on remaining margin so unrealized losses shrink it too.
    let unlocked = remaining.sub(position.locked_margin).clamp_non_negative();
    Ok(accessible.min(unlocked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionId, SignedSize};
    use rust_decimal_macros::dec;

    fn position(margin: Decimal, size: Decimal, last_price: Decimal) -> Position {
        Position {
            id: PositionId(1),
            last_funding_index: 0,
            margin: Quote::new(margin),
            locked_margin: Quote::zero(),
            last_price: Price::new_unchecked(last_price),
            size: SignedSize::new(size),
        }
    }

    #[test]
    fn pnl_follows_price_moves() {
        let pos = position(dec!(1000), dec!(50), dec!(100));

        let up = profit_loss(&pos, Price::new_unchecked(dec!(110))).unwrap();
        assert_eq!(up.value(), dec!(500));

        let down = profit_loss(&pos, Price::new_unchecked(dec!(90))).unwrap();
        assert_eq!(down.value(), dec!(-500));
    }

    #[test]
    fn remaining_margin_includes_funding() {
        let pos = position(dec!(1000), dec!(50), dec!(100));

        // funding sequence moved -0.5 per unit since last touch: longs pay 25
        let remaining =
            remaining_margin(&pos, Price::new_unchecked(dec!(100)), dec!(0), dec!(-0.5)).unwrap();
        assert_eq!(remaining.value(), dec!(975));
    }

    #[test]
    fn remaining_margin_floors_at_zero_but_signed_is_reported() {
        let pos = position(dec!(100), dec!(50), dec!(100));
        let crash = Price::new_unchecked(dec!(50));

        let signed =
            margin_plus_profit_funding(&pos, crash, dec!(0), dec!(0)).unwrap();
        assert_eq!(signed.value(), dec!(-2400));

        let floored = remaining_margin(&pos, crash, dec!(0), dec!(0)).unwrap();
        assert_eq!(floored, Quote::zero());
    }

    #[test]
    fn leverage_reads_infinite_at_zero_margin() {
        let lev =
            current_leverage(dec!(1), Price::new_unchecked(dec!(100)), Quote::zero()).unwrap();
        assert_eq!(lev, Decimal::MAX);

        let lev =
            current_leverage(dec!(10), Price::new_unchecked(dec!(100)), Quote::new(dec!(200)))
                .unwrap();
        assert_eq!(lev, dec!(5));
    }

    #[test]
    fn accessible_margin_closed_position_is_everything() {
        let pos = position(dec!(500), dec!(0), dec!(100));
        let accessible = accessible_margin(
            &pos,
            Price::new_unchecked(dec!(100)),
            dec!(0),
            dec!(0),
            &MarketParams::default(),
            &GlobalParams::default(),
        )
        .unwrap();
        assert_eq!(accessible.value(), dec!(500));
    }

    #[test]
    fn accessible_margin_respects_leverage_floor() {
        // 10 units at 100 = 1000 notional; 10x cap needs 100 retained
        let pos = position(dec!(500), dec!(10), dec!(100));
        let accessible = accessible_margin(
            &pos,
            Price::new_unchecked(dec!(100)),
            dec!(0),
            dec!(0),
            &MarketParams::default(),
            &GlobalParams::default(),
        )
        .unwrap();
        // binding constraint here is the leverage floor (100) vs min initial (40)
        assert_eq!(accessible.value(), dec!(400));
    }

    #[test]
    fn accessible_margin_respects_locked_margin() {
        let mut pos = position(dec!(500), dec!(0), dec!(100));
        pos.locked_margin = Quote::new(dec!(450));
        let accessible = accessible_margin(
            &pos,
            Price::new_unchecked(dec!(100)),
            dec!(0),
            dec!(0),
            &MarketParams::default(),
            &GlobalParams::default(),
        )
        .unwrap();
        assert_eq!(accessible.value(), dec!(50));
    }

    #[test]
    fn accessible_margin_tracks_remaining_not_stored_margin() {
        // unrealized gains are withdrawable above the retained floor
        let pos = position(dec!(500), dec!(10), dec!(100));
        let accessible = accessible_margin(
            &pos,
            Price::new_unchecked(dec!(130)),
            dec!(0),
            dec!(0),
            &MarketParams::default(),
            &GlobalParams::default(),
        )
        .unwrap();
        // remaining 800 minus the 10x leverage floor on 1300 notional
        assert_eq!(accessible.value(), dec!(670));

        // and unrealized losses shrink what the lock leaves free
        let mut pos = position(dec!(500), dec!(10), dec!(100));
        pos.locked_margin = Quote::new(dec!(300));
        let accessible = accessible_margin(
            &pos,
            Price::new_unchecked(dec!(90)),
            dec!(0),
            dec!(0),
            &MarketParams::default(),
            &GlobalParams::default(),
        )
        .unwrap();
        // remaining 400: the lock leaves 100, tighter than the 90 leverage floor
        assert_eq!(accessible.value(), dec!(100));
    }
}
