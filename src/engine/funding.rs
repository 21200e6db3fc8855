// 12.2: funding orchestration. every mutating operation validates against a
// staged funding value (what the next sequence entry would carry) and appends it
// only on commit, so a rejected operation leaves the sequence untouched.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, FundingRecomputedEvent};
use crate::funding::next_funding_entry;
use crate::treasury::Treasury;
use crate::types::{MarketId, Price};
use rust_decimal::Decimal;

impl<T: Treasury> Engine<T> {
    /// Append a funding-sequence entry capturing all accrual since the last one.
    /// Recomputing twice at the same timestamp appends a zero-delta entry;
    /// accrual is never double counted.
    pub fn recompute_funding(&mut self, market_id: MarketId) -> Result<usize, EngineError> {
        self.check_suspension(market_id)?;
        let price = self.valid_price(market_id)?;
        let funding = self.staged_funding(market_id, price)?;
        self.commit_funding(market_id, funding)
    }

    /// Recompute before a funding-relevant parameter write. a market that has
    /// never seen a valid price has nothing accrued, so it is skipped rather
    /// than failed.
    pub(super) fn recompute_funding_if_priced(
        &mut self,
        market_id: MarketId,
    ) -> Result<(), EngineError> {
        let ledger = self.ledger(market_id)?;
        let price = match &ledger.price {
            Some(reading) if !reading.invalid => reading.price,
            _ => return Ok(()),
        };
        let funding = self.staged_funding(market_id, price)?;
        self.commit_funding(market_id, funding)?;
        Ok(())
    }

    /// The cumulative funding value the next sequence entry will carry,
    /// computed without recording it.
    pub(super) fn staged_funding(
        &self,
        market_id: MarketId,
        price: Price,
    ) -> Result<Decimal, EngineError> {
        let ledger = self.ledger(market_id)?;
        let params = self.market_params(market_id)?;
        Ok(next_funding_entry(ledger, price, self.current_time, &params)?)
    }

    /// Record a previously staged funding value. infallible once the market
    /// exists; returns the new latest index.
    pub(super) fn commit_funding(
        &mut self,
        market_id: MarketId,
        funding: Decimal,
    ) -> Result<usize, EngineError> {
        let timestamp = self.current_time;
        let ledger = self.ledger_mut(market_id)?;
        let index = ledger.push_funding_entry(funding, timestamp);
        self.emit_event(EventPayload::FundingRecomputed(FundingRecomputedEvent {
            market_id,
            index,
            funding,
            timestamp,
        }));
        Ok(index)
    }
}
