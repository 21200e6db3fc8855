// 12.3: margin transfers. deposits burn the settlement asset through the
// treasury and credit the *realized* amount; withdrawals are refused if they
// would leave the position liquidatable or cut into locked margin.

use super::core::Engine;
use super::results::{EngineError, MarginTransferOutcome};
use crate::events::{EventPayload, MarginModifiedEvent};
use crate::fixed::mul_decimal;
use crate::liquidation::liquidation_margin;
use crate::margin::{accessible_margin, margin_plus_profit_funding, remaining_margin};
use crate::treasury::Treasury;
use crate::types::{AccountId, MarketId, Quote};

impl<T: Treasury> Engine<T> {
    /// Move margin between the account's settlement-asset balance and its
    /// position. positive `delta` deposits, negative withdraws, zero only
    /// realizes pnl and funding into the stored margin.
    pub fn transfer_margin(
        &mut self,
        market_id: MarketId,
        account: AccountId,
        delta: Quote,
    ) -> Result<MarginTransferOutcome, EngineError> {
        self.check_suspension(market_id)?;
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let (snapshot, entry_funding) = self.snapshot_position(market_id, account, price)?;

        // realize pnl + accrued funding into margin at the staged funding value
        let signed = margin_plus_profit_funding(&snapshot, price, entry_funding, staged)?;
        let realized_margin = signed.clamp_non_negative();

        if delta.is_negative() {
            if signed.is_negative() {
                return Err(EngineError::InsufficientMargin);
            }
            let after = realized_margin.add(delta);
            if after.is_negative() || after < snapshot.locked_margin {
                return Err(EngineError::InsufficientMargin);
            }
            if snapshot.is_open() {
                let floor = liquidation_margin(snapshot.size.abs(), price, self.params.global())?;
                if after <= floor {
                    return Err(EngineError::InsufficientMargin);
                }
            }
        }

        // validated; every fallible step runs before the first write so a
        // failure leaves the funding sequence and treasury untouched
        let old_term = Self::debt_term(&snapshot, entry_funding)?;
        let carried = mul_decimal(snapshot.size.value(), price.value() + staged)?;
        let index = self.commit_funding(market_id, staged)?;

        let realized_delta = if delta.is_negative() {
            self.treasury.issue(account, delta.abs());
            delta
        } else if !delta.is_zero() {
            self.treasury.burn(account, delta)
        } else {
            Quote::zero()
        };

        let new_margin = realized_margin.add(realized_delta).clamp_non_negative();
        let new_term = new_margin.value() - carried;

        let ledger = self.ledger_mut(market_id)?;
        let position = ledger.touch_position(account, price);
        let id = position.id;
        position.margin = new_margin;
        position.last_price = price;
        position.last_funding_index = index;
        ledger.add_debt_correction(new_term - old_term);

        if !delta.is_zero() {
            self.emit_event(EventPayload::MarginModified(MarginModifiedEvent {
                market_id,
                account,
                delta: realized_delta,
                new_margin,
            }));
        }

        Ok(MarginTransferOutcome {
            id,
            requested: delta,
            realized: realized_delta,
            new_margin,
        })
    }

    /// Remaining margin at the current price and staged funding, floored at zero.
    pub fn remaining_margin(
        &self,
        market_id: MarketId,
        account: AccountId,
    ) -> Result<Quote, EngineError> {
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let ledger = self.ledger(market_id)?;
        let position = ledger.position(account).ok_or(EngineError::NoSuchPosition)?;
        let entry = ledger.funding_at(position.last_funding_index);
        Ok(remaining_margin(position, price, entry, staged)?)
    }

    /// How much margin could be withdrawn right now without tripping the
    /// initial-margin, leverage or liquidation floors.
    pub fn accessible_margin(
        &self,
        market_id: MarketId,
        account: AccountId,
    ) -> Result<Quote, EngineError> {
        let price = self.valid_price(market_id)?;
        let staged = self.staged_funding(market_id, price)?;
        let params = self.market_params(market_id)?;
        let ledger = self.ledger(market_id)?;
        let position = ledger.position(account).ok_or(EngineError::NoSuchPosition)?;
        let entry = ledger.funding_at(position.last_funding_index);
        Ok(accessible_margin(
            position,
            price,
            entry,
            staged,
            &params,
            self.params.global(),
        )?)
    }
}
