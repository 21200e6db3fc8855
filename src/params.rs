// 3.0: per-market and global engine parameters. fees, leverage caps, skew scale,
// funding cap, liquidation ratios. plain mutable key-value; the hard part is the
// coupling contract with funding: any write that changes the funding formula must
// go through the engine so the market recomputes funding first (see engine/core.rs).

use crate::types::{MarketId, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Per-market parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    /// Fee rate for skew-increasing trades.
    pub taker_fee: Decimal,
    /// Fee rate for skew-reducing trades. maker_fee <= taker_fee.
    pub maker_fee: Decimal,
    /// Leverage cap as a plain multiplier (10 = 10x).
    pub max_leverage: Decimal,
    /// Cap on the notional value of either side of the market.
    pub max_single_side_value_usd: Quote,
    /// Funding rate cap, per day.
    pub max_funding_rate: Decimal,
    /// Skew normalizer: the notional skew at which funding saturates. must be > 0.
    pub skew_scale_usd: Decimal,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            taker_fee: dec!(0.003),
            maker_fee: dec!(0.001),
            max_leverage: dec!(10),
            max_single_side_value_usd: Quote::new(dec!(100_000_000)),
            max_funding_rate: dec!(0.1),
            skew_scale_usd: dec!(100_000),
        }
    }
}

impl MarketParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.skew_scale_usd <= Decimal::ZERO {
            return Err(ParamsError::InvalidParameter("skew_scale_usd"));
        }
        if self.max_leverage <= Decimal::ZERO {
            return Err(ParamsError::InvalidParameter("max_leverage"));
        }
        if self.taker_fee < Decimal::ZERO || self.maker_fee < Decimal::ZERO {
            return Err(ParamsError::InvalidParameter("fee"));
        }
        if self.maker_fee > self.taker_fee {
            return Err(ParamsError::InvalidParameter("maker_fee"));
        }
        if self.max_funding_rate < Decimal::ZERO {
            return Err(ParamsError::InvalidParameter("max_funding_rate"));
        }
        Ok(())
    }
}

/// Global parameters shared by every market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalParams {
    /// Floor on the keeper fee paid out of a liquidated position.
    pub min_keeper_fee: Quote,
    /// Fraction of notional paid to the liquidating keeper.
    pub liquidation_fee_ratio: Decimal,
    /// Extra fraction of notional kept as buffer above the keeper fee.
    pub liquidation_buffer_ratio: Decimal,
    /// Minimum margin an open position must retain. must stay >= min_keeper_fee.
    pub min_initial_margin: Quote,
    /// Leverage headroom tolerated above max_leverage before a trade is rejected.
    /// keeps price rounding at the boundary from causing spurious rejections.
    pub max_leverage_headroom: Decimal,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            min_keeper_fee: Quote::new(dec!(2)),
            liquidation_fee_ratio: dec!(0.0035),
            liquidation_buffer_ratio: dec!(0.0025),
            min_initial_margin: Quote::new(dec!(40)),
            max_leverage_headroom: dec!(0.01),
        }
    }
}

/// Mutable parameter storage keyed by market, injected into the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterStore {
    markets: HashMap<MarketId, MarketParams>,
    global: GlobalParams,
}

impl ParameterStore {
    pub fn new(global: GlobalParams) -> Self {
        Self {
            markets: HashMap::new(),
            global,
        }
    }

    pub fn insert_market(&mut self, market_id: MarketId, params: MarketParams) -> Result<(), ParamsError> {
        params.validate()?;
        self.markets.insert(market_id, params);
        Ok(())
    }

    pub fn market(&self, market_id: MarketId) -> Option<&MarketParams> {
        self.markets.get(&market_id)
    }

    pub fn global(&self) -> &GlobalParams {
        &self.global
    }

    pub fn set_taker_fee(&mut self, market_id: MarketId, fee: Decimal) -> Result<(), ParamsError> {
        let params = self.market_mut(market_id)?;
        let mut next = params.clone();
        next.taker_fee = fee;
        next.validate()?;
        *params = next;
        Ok(())
    }

    pub fn set_maker_fee(&mut self, market_id: MarketId, fee: Decimal) -> Result<(), ParamsError> {
        let params = self.market_mut(market_id)?;
        let mut next = params.clone();
        next.maker_fee = fee;
        next.validate()?;
        *params = next;
        Ok(())
    }

    pub fn set_max_leverage(&mut self, market_id: MarketId, max_leverage: Decimal) -> Result<(), ParamsError> {
        let params = self.market_mut(market_id)?;
        let mut next = params.clone();
        next.max_leverage = max_leverage;
        next.validate()?;
        *params = next;
        Ok(())
    }

    pub fn set_max_single_side_value(&mut self, market_id: MarketId, cap: Quote) -> Result<(), ParamsError> {
        if cap.is_negative() {
            return Err(ParamsError::InvalidParameter("max_single_side_value_usd"));
        }
        self.market_mut(market_id)?.max_single_side_value_usd = cap;
        Ok(())
    }

    // funding-relevant writes. callers must recompute funding on the market first;
    // the engine wraps these in its two-phase setters.
    pub fn set_max_funding_rate(&mut self, market_id: MarketId, rate: Decimal) -> Result<(), ParamsError> {
        let params = self.market_mut(market_id)?;
        let mut next = params.clone();
        next.max_funding_rate = rate;
        next.validate()?;
        *params = next;
        Ok(())
    }

    pub fn set_skew_scale(&mut self, market_id: MarketId, skew_scale_usd: Decimal) -> Result<(), ParamsError> {
        let params = self.market_mut(market_id)?;
        let mut next = params.clone();
        next.skew_scale_usd = skew_scale_usd;
        next.validate()?;
        *params = next;
        Ok(())
    }

    pub fn set_min_keeper_fee(&mut self, fee: Quote) -> Result<(), ParamsError> {
        if self.global.min_initial_margin < fee {
            return Err(ParamsError::MarginBelowKeeperFee {
                min_initial_margin: self.global.min_initial_margin,
                min_keeper_fee: fee,
            });
        }
        self.global.min_keeper_fee = fee;
        Ok(())
    }

    pub fn set_min_initial_margin(&mut self, margin: Quote) -> Result<(), ParamsError> {
        if margin < self.global.min_keeper_fee {
            return Err(ParamsError::MarginBelowKeeperFee {
                min_initial_margin: margin,
                min_keeper_fee: self.global.min_keeper_fee,
            });
        }
        self.global.min_initial_margin = margin;
        Ok(())
    }

    pub fn set_liquidation_fee_ratio(&mut self, ratio: Decimal) -> Result<(), ParamsError> {
        if ratio < Decimal::ZERO {
            return Err(ParamsError::InvalidParameter("liquidation_fee_ratio"));
        }
        self.global.liquidation_fee_ratio = ratio;
        Ok(())
    }

    pub fn set_liquidation_buffer_ratio(&mut self, ratio: Decimal) -> Result<(), ParamsError> {
        if ratio < Decimal::ZERO {
            return Err(ParamsError::InvalidParameter("liquidation_buffer_ratio"));
        }
        self.global.liquidation_buffer_ratio = ratio;
        Ok(())
    }

    fn market_mut(&mut self, market_id: MarketId) -> Result<&mut MarketParams, ParamsError> {
        self.markets
            .get_mut(&market_id)
            .ok_or(ParamsError::UnknownMarket(market_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("min initial margin {min_initial_margin} below min keeper fee {min_keeper_fee}")]
    MarginBelowKeeperFee {
        min_initial_margin: Quote,
        min_keeper_fee: Quote,
    },

    #[error("no parameters for market {0:?}")]
    UnknownMarket(MarketId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_market() -> ParameterStore {
        let mut store = ParameterStore::new(GlobalParams::default());
        store.insert_market(MarketId(1), MarketParams::default()).unwrap();
        store
    }

    #[test]
    fn zero_skew_scale_rejected() {
        let mut store = store_with_market();
        let result = store.set_skew_scale(MarketId(1), Decimal::ZERO);
        assert_eq!(result, Err(ParamsError::InvalidParameter("skew_scale_usd")));
    }

    #[test]
    fn maker_fee_cannot_exceed_taker_fee() {
        let mut store = store_with_market();
        assert!(store.set_maker_fee(MarketId(1), dec!(0.005)).is_err());
        assert!(store.set_maker_fee(MarketId(1), dec!(0.0005)).is_ok());
    }

    #[test]
    fn min_initial_margin_must_cover_keeper_fee() {
        let mut store = store_with_market();
        let result = store.set_min_initial_margin(Quote::new(dec!(1)));
        assert!(matches!(result, Err(ParamsError::MarginBelowKeeperFee { .. })));

        // raising the keeper fee above the margin floor is equally rejected
        let result = store.set_min_keeper_fee(Quote::new(dec!(1_000)));
        assert!(matches!(result, Err(ParamsError::MarginBelowKeeperFee { .. })));
    }

    #[test]
    fn unknown_market_write_fails() {
        let mut store = store_with_market();
        assert_eq!(
            store.set_taker_fee(MarketId(9), dec!(0.001)),
            Err(ParamsError::UnknownMarket(MarketId(9)))
        );
    }
}
