// 12.6: read-only views. everything here evaluates against the staged funding
// value (funding as if recomputed now) so reads and a subsequent mutation at
// the same timestamp agree. an invalid price flags the view instead of lying.

use super::core::Engine;
use super::results::{EngineError, MarketSizes, MarketSummary, PositionSummary};
use crate::fixed::mul_decimal;
use crate::funding::{current_funding_rate_per_day, unrecorded_funding};
use crate::liquidation;
use crate::margin::{accessible_margin, margin_plus_profit_funding, profit_loss};
use crate::treasury::Treasury;
use crate::types::{AccountId, MarketId, Price, Quote};
use rust_decimal::Decimal;

impl<T: Treasury> Engine<T> {
    /// The latest oracle reading: price plus its validity flag.
    pub fn asset_price(&self, market_id: MarketId) -> Result<(Price, bool), EngineError> {
        let ledger = self.ledger(market_id)?;
        match &ledger.price {
            Some(reading) => Ok((reading.price, reading.invalid)),
            None => Err(EngineError::InvalidPrice(market_id)),
        }
    }

    /// Open interest per side.
    pub fn market_sizes(&self, market_id: MarketId) -> Result<MarketSizes, EngineError> {
        let ledger = self.ledger(market_id)?;
        Ok(MarketSizes {
            long: ledger.long_side_size(),
            short: ledger.short_side_size(),
        })
    }

    /// Debt the market contributes to the system:
    /// skew * (price + cumulative funding per unit) + entry_debt_correction,
    /// floored at zero. equal to the sum of every open position's signed
    /// remaining margin.
    pub fn market_debt(&self, market_id: MarketId) -> Result<Quote, EngineError> {
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let ledger = self.ledger(market_id)?;
        let skew_value = mul_decimal(ledger.market_skew, price.value() + staged)?;
        Ok(Quote::new(skew_value + ledger.entry_debt_correction).clamp_non_negative())
    }

    pub fn market_summary(&self, market_id: MarketId) -> Result<MarketSummary, EngineError> {
        let ledger = self.ledger(market_id)?;
        let reading = ledger
            .price
            .as_ref()
            .ok_or(EngineError::InvalidPrice(market_id))?;
        let price = reading.price;
        let price_invalid = reading.invalid;
        let params = self.market_params(market_id)?;

        let rate = current_funding_rate_per_day(ledger.market_skew, price, &params)?;
        let unrecorded = unrecorded_funding(
            ledger.market_skew,
            price,
            ledger.funding_last_recomputed,
            self.current_time,
            &params,
        )?;
        let staged = ledger.latest_funding() + unrecorded;
        let skew_value = mul_decimal(ledger.market_skew, price.value() + staged)?;
        let market_debt =
            Quote::new(skew_value + ledger.entry_debt_correction).clamp_non_negative();

        Ok(MarketSummary {
            market_id,
            price,
            market_size: ledger.market_size,
            market_skew: ledger.market_skew,
            market_debt,
            current_funding_rate: rate,
            unrecorded_funding: unrecorded,
            price_invalid,
        })
    }

    /// Everything a keeper or UI needs to know about one position. computed at
    /// the latest price even when the oracle flags it invalid, but then
    /// `price_invalid` is set and `can_liquidate` reads false.
    pub fn position_summary(
        &self,
        market_id: MarketId,
        account: AccountId,
    ) -> Result<PositionSummary, EngineError> {
        let ledger = self.ledger(market_id)?;
        let reading = ledger
            .price
            .as_ref()
            .ok_or(EngineError::InvalidPrice(market_id))?;
        let price = reading.price;
        let price_invalid = reading.invalid;
        let position = ledger.position(account).ok_or(EngineError::NoSuchPosition)?;
        let params = self.market_params(market_id)?;
        let global = self.params.global();

        let entry = ledger.funding_at(position.last_funding_index);
        let unrecorded = unrecorded_funding(
            ledger.market_skew,
            price,
            ledger.funding_last_recomputed,
            self.current_time,
            &params,
        )?;
        let staged = ledger.latest_funding() + unrecorded;

        let pnl = profit_loss(position, price)?;
        let accrued = crate::funding::accrued_funding(position.size, entry, staged)?;
        let remaining_signed = margin_plus_profit_funding(position, price, entry, staged)?;
        let accessible = accessible_margin(position, price, entry, staged, &params, global)?;

        let can_liquidate = if price_invalid {
            false
        } else {
            liquidation::can_liquidate(position, price, entry, staged, global)?
        };
        let approx_price =
            liquidation::approx_liquidation_price(position, price, entry, staged, global)?;
        let approx_fee =
            liquidation::approx_liquidation_fee(position, price, entry, staged, global)?;

        Ok(PositionSummary {
            id: position.id,
            size: position.size,
            margin: position.margin,
            profit_loss: pnl,
            accrued_funding: accrued,
            remaining_margin: remaining_signed,
            accessible_margin: accessible,
            can_liquidate,
            approx_liquidation_price: approx_price,
            approx_liquidation_fee: approx_fee,
            price_invalid,
        })
    }

    /// The instantaneous funding rate per day at the current price.
    pub fn current_funding_rate(&self, market_id: MarketId) -> Result<Decimal, EngineError> {
        let price = self.valid_price(market_id)?;
        let ledger = self.ledger(market_id)?;
        let params = self.market_params(market_id)?;
        Ok(current_funding_rate_per_day(ledger.market_skew, price, &params)?)
    }
}
