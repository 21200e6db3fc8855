// 12.5: liquidation. the keeper fee is capped by what the position actually has
// left, the remainder of the margin goes to the fee pool, and the record keeps
// its id with margin and size zeroed.

use super::core::Engine;
use super::results::{EngineError, LiquidationOutcome};
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::liquidation;
use crate::margin::remaining_margin;
use crate::treasury::Treasury;
use crate::types::{AccountId, MarketId, Quote, SignedSize};

impl<T: Treasury> Engine<T> {
    /// Liquidation-margin floor for the account's open position at the current
    /// price.
    pub fn liquidation_margin(
        &self,
        market_id: MarketId,
        account: AccountId,
    ) -> Result<Quote, EngineError> {
        let price = self.valid_price(market_id)?;
        let ledger = self.ledger(market_id)?;
        let position = ledger.position(account).ok_or(EngineError::NoSuchPosition)?;
        if !position.is_open() {
            return Err(EngineError::ZeroSizePosition);
        }
        Ok(liquidation::liquidation_margin(
            position.size.abs(),
            price,
            self.params.global(),
        )?)
    }

    /// Whether the position can be liquidated right now. an invalid price is an
    /// error, never a "yes".
    pub fn can_liquidate(
        &self,
        market_id: MarketId,
        account: AccountId,
    ) -> Result<bool, EngineError> {
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let ledger = self.ledger(market_id)?;
        let position = ledger.position(account).ok_or(EngineError::NoSuchPosition)?;
        let entry = ledger.funding_at(position.last_funding_index);
        Ok(liquidation::can_liquidate(
            position,
            price,
            entry,
            staged,
            self.params.global(),
        )?)
    }

    /// Liquidate an underwater position on behalf of `liquidator`. the keeper
    /// fee (capped by remaining margin) is issued to the liquidator and any
    /// margin left after that goes to the fee pool.
    pub fn liquidate_position(
        &mut self,
        market_id: MarketId,
        account: AccountId,
        liquidator: AccountId,
    ) -> Result<LiquidationOutcome, EngineError> {
        self.check_suspension(market_id)?;
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let (snapshot, entry_funding) = self.snapshot_position(market_id, account, price)?;

        if snapshot.size.is_zero() {
            return Err(EngineError::ZeroSizePosition);
        }
        if !liquidation::can_liquidate(&snapshot, price, entry_funding, staged, self.params.global())? {
            return Err(EngineError::PositionNotLiquidatable);
        }

        let remaining = remaining_margin(&snapshot, price, entry_funding, staged)?;
        let computed_fee =
            liquidation::liquidation_fee(snapshot.size.abs(), price, self.params.global())?;
        let fee = computed_fee.min(remaining);
        let pool_share = remaining.sub(fee).clamp_non_negative();

        // validated; commit
        let old_term = Self::debt_term(&snapshot, entry_funding)?;
        let index = self.commit_funding(market_id, staged)?;

        if !fee.is_zero() {
            self.treasury.issue(liquidator, fee);
        }
        if !pool_share.is_zero() {
            self.treasury.issue_to_fee_pool(pool_share);
        }

        let ledger = self.ledger_mut(market_id)?;
        let position = ledger.touch_position(account, price);
        let id = position.id;
        let old_size = position.size;
        position.margin = Quote::zero();
        position.size = SignedSize::zero();
        position.last_price = price;
        position.last_funding_index = index;
        ledger.apply_size_delta(old_size, SignedSize::zero());
        // zeroed margin and size contribute nothing to the correction
        ledger.add_debt_correction(-old_term);

        self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            market_id,
            id,
            account,
            liquidator,
            size: old_size,
            price,
            fee,
            pool_share,
        }));

        Ok(LiquidationOutcome {
            id,
            account,
            liquidator,
            size: old_size,
            price,
            fee,
            pool_share,
        })
    }
}
