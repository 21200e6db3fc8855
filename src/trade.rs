// 9.0: trade projection. post_trade_details is pure and side-effect free: it is
// both the dry-run quote for traders/keepers and the exact values the mutating
// path commits, so what was quoted is what lands in the ledger.
//
// check order is part of the contract: fee comes off the margin before the
// margin check, reducing exposure is never blocked by the market-size cap, and a
// position that is already liquidatable cannot trade out of it.

use crate::fixed::{div_decimal, mul_decimal, MathError};
use crate::ledger::Position;
use crate::liquidation::liquidation_margin;
use crate::margin::remaining_margin;
use crate::params::{GlobalParams, MarketParams};
use crate::types::{Price, Quote, SignedSize};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Ok,
    NilOrder,
    InsufficientMargin,
    MaxLeverageExceeded,
    MaxMarketSizeExceeded,
    CanLiquidate,
}

/// What a trade would do, without doing it.
#[derive(Debug, Clone, Copy)]
pub struct TradeProjection {
    pub new_margin: Quote,
    pub new_size: SignedSize,
    pub fee: Quote,
    pub status: TradeStatus,
}

impl TradeProjection {
    fn rejected(status: TradeStatus) -> Self {
        Self {
            new_margin: Quote::zero(),
            new_size: SignedSize::zero(),
            fee: Quote::zero(),
            status,
        }
    }
}

// 9.1: two-rate fee policy. a trade on the heavy side of the skew (or one that
// crosses it) pays taker_fee; a skew-reducing trade pays maker_fee. selection is
// on pre-trade skew, and a crossing trade pays taker on the whole delta.
pub fn select_fee_rate(market_skew: Decimal, size_delta: Decimal, params: &MarketParams) -> Decimal {
    if market_skew.is_zero() || market_skew * size_delta > Decimal::ZERO {
        return params.taker_fee;
    }
    if size_delta.abs() <= market_skew.abs() {
        params.maker_fee
    } else {
        params.taker_fee
    }
}

#[allow(clippy::too_many_arguments)]
pub fn post_trade_details(
    position: &Position,
    size_delta: Decimal,
    price: Price,
    fee_rate: Decimal,
    entry_funding: Decimal,
    current_funding: Decimal,
    market_size: Decimal,
    market_skew: Decimal,
    market_params: &MarketParams,
    global: &GlobalParams,
) -> Result<TradeProjection, MathError> {
    if size_delta.is_zero() {
        return Ok(TradeProjection::rejected(TradeStatus::NilOrder));
    }

    let fee = Quote::new(mul_decimal(
        mul_decimal(size_delta.abs(), price.value())?,
        fee_rate,
    )?);

    let remaining = remaining_margin(position, price, entry_funding, current_funding)?;
    let new_margin = remaining.sub(fee);
    let new_size = position.size.add(size_delta);

    let projection = TradeProjection {
        new_margin,
        new_size,
        fee,
        status: TradeStatus::Ok,
    };

    // fee is deducted before the margin check, deliberately
    if new_margin.is_negative() {
        return Ok(TradeProjection {
            status: TradeStatus::InsufficientMargin,
            ..projection
        });
    }

    if !new_size.is_zero() {
        let notional = mul_decimal(new_size.abs(), price.value())?;
        let leverage = if new_margin.is_zero() {
            Decimal::MAX
        } else {
            div_decimal(notional, new_margin.value())?
        };
        let allowed = mul_decimal(
            market_params.max_leverage,
            Decimal::ONE + global.max_leverage_headroom,
        )?;
        if leverage > allowed {
            return Ok(TradeProjection {
                status: TradeStatus::MaxLeverageExceeded,
                ..projection
            });
        }
    }

    // the one-sided cap never blocks a reduction in exposure
    let reduces_exposure = new_size.abs() < position.size.abs();
    if !reduces_exposure && !new_size.is_zero() {
        let new_market_size = market_size - position.size.abs() + new_size.abs();
        let new_market_skew = market_skew - position.size.value() + new_size.value();
        let side_size = if new_size.is_long() {
            (new_market_size + new_market_skew) / dec!(2)
        } else {
            (new_market_size - new_market_skew) / dec!(2)
        };
        let side_value = mul_decimal(side_size, price.value())?;
        if side_value > market_params.max_single_side_value_usd.value() {
            return Ok(TradeProjection {
                status: TradeStatus::MaxMarketSizeExceeded,
                ..projection
            });
        }
    }

    // once underwater, liquidation is the only sanctioned exit
    if position.is_open() {
        let floor = liquidation_margin(position.size.abs(), price, global)?;
        if remaining <= floor {
            return Ok(TradeProjection {
                status: TradeStatus::CanLiquidate,
                ..projection
            });
        }
    }

    Ok(projection)
}
