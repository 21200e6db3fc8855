// 12.4: position modification. the mutating path runs the same pure projection
// exposed as the dry-run quote and commits exactly its values, so a quoted
// trade and an executed trade can never disagree.

use super::core::Engine;
use super::results::{EngineError, TradeOutcome};
use crate::events::{EventPayload, PositionModifiedEvent};
use crate::fixed::mul_decimal;
use crate::trade::{self, TradeProjection};
use crate::treasury::Treasury;
use crate::types::{AccountId, MarketId, Quote, SignedSize};
use rust_decimal::Decimal;

impl<T: Treasury> Engine<T> {
    /// Dry-run quote: what `modify_position` with this delta would do,
    /// including the rejection reason if any. no state change.
    pub fn post_trade_details(
        &self,
        market_id: MarketId,
        account: AccountId,
        size_delta: Decimal,
    ) -> Result<TradeProjection, EngineError> {
        self.check_suspension(market_id)?;
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let (snapshot, entry_funding) = self.snapshot_position(market_id, account, price)?;
        let params = self.market_params(market_id)?;
        let ledger = self.ledger(market_id)?;

        let fee_rate = trade::select_fee_rate(ledger.market_skew, size_delta, &params);
        Ok(trade::post_trade_details(
            &snapshot,
            size_delta,
            price,
            fee_rate,
            entry_funding,
            staged,
            ledger.market_size,
            ledger.market_skew,
            &params,
            self.params.global(),
        )?)
    }

    /// Change the position's size by `size_delta` at the current price, charging
    /// the projected fee to the fee pool. all-or-nothing: a rejected projection
    /// writes nothing, the funding sequence included.
    pub fn modify_position(
        &mut self,
        market_id: MarketId,
        account: AccountId,
        size_delta: Decimal,
    ) -> Result<TradeOutcome, EngineError> {
        self.check_suspension(market_id)?;
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let (snapshot, entry_funding) = self.snapshot_position(market_id, account, price)?;
        let params = self.market_params(market_id)?;
        let ledger = self.ledger(market_id)?;

        let fee_rate = trade::select_fee_rate(ledger.market_skew, size_delta, &params);
        let projection = trade::post_trade_details(
            &snapshot,
            size_delta,
            price,
            fee_rate,
            entry_funding,
            staged,
            ledger.market_size,
            ledger.market_skew,
            &params,
            self.params.global(),
        )?;
        if let Some(err) = EngineError::from_trade_status(projection.status) {
            return Err(err);
        }

        // validated; every fallible step runs before the first write so a
        // failure leaves the funding sequence and treasury untouched
        let old_term = Self::debt_term(&snapshot, entry_funding)?;
        let new_term = projection.new_margin.value()
            - mul_decimal(projection.new_size.value(), price.value() + staged)?;
        let index = self.commit_funding(market_id, staged)?;

        if !projection.fee.is_zero() {
            self.treasury.issue_to_fee_pool(projection.fee);
        }

        let ledger = self.ledger_mut(market_id)?;
        let position = ledger.touch_position(account, price);
        let id = position.id;
        let old_size = position.size;
        position.margin = projection.new_margin;
        position.size = projection.new_size;
        position.last_price = price;
        position.last_funding_index = index;
        ledger.apply_size_delta(old_size, projection.new_size);
        ledger.add_debt_correction(new_term - old_term);

        self.emit_event(EventPayload::PositionModified(PositionModifiedEvent {
            market_id,
            id,
            account,
            margin: projection.new_margin,
            size: projection.new_size,
            trade_size: size_delta,
            price,
            fee: projection.fee,
        }));

        Ok(TradeOutcome {
            id,
            margin: projection.new_margin,
            size: projection.new_size,
            trade_size: size_delta,
            fee: projection.fee,
            price,
        })
    }

    /// Close the whole position (`size_delta = -size`). the close pays the
    /// regular trade fee and leaves the freed margin in the record for
    /// withdrawal.
    pub fn close_position(
        &mut self,
        market_id: MarketId,
        account: AccountId,
    ) -> Result<TradeOutcome, EngineError> {
        self.check_suspension(market_id)?;
        let size = self
            .ledger(market_id)?
            .position(account)
            .map(|p| p.size)
            .unwrap_or_else(SignedSize::zero);
        if size.is_zero() {
            return Err(EngineError::NoPositionOpen);
        }
        self.modify_position(market_id, account, -size.value())
    }

    /// Fee a trade of `size_delta` would pay right now, rate selection included.
    pub fn order_fee(
        &self,
        market_id: MarketId,
        size_delta: Decimal,
    ) -> Result<Quote, EngineError> {
        let price = self.valid_price(market_id)?;
        let params = self.market_params(market_id)?;
        let ledger = self.ledger(market_id)?;
        let rate = trade::select_fee_rate(ledger.market_skew, size_delta, &params);
        Ok(Quote::new(mul_decimal(
            mul_decimal(size_delta.abs(), price.value())?,
            rate,
        )?))
    }
}
