// 12.1 engine/core.rs: main engine struct. holds markets, parameters, the
// treasury boundary, the event log, and the deterministic clock.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::events::{
    Event, EventId, EventPayload, MarketAddedEvent, ParameterUpdatedEvent, PriceUpdatedEvent,
};
use crate::fixed::mul_decimal;
use crate::ledger::{MarketLedger, MarketStatus, Position};
use crate::oracle::PriceReading;
use crate::params::{GlobalParams, MarketParams, ParameterStore};
use crate::treasury::{InMemoryTreasury, Treasury};
use crate::types::{AccountId, MarketId, PositionId, Price, Quote, Timestamp};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Engine<T: Treasury = InMemoryTreasury> {
    pub(super) config: EngineConfig,
    pub(super) params: ParameterStore,
    pub(super) markets: HashMap<MarketId, MarketLedger>,
    pub(super) treasury: T,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
    pub(super) system_suspended: bool,
}

impl Engine<InMemoryTreasury> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_treasury(config, InMemoryTreasury::new())
    }
}

impl<T: Treasury> Engine<T> {
    pub fn with_treasury(config: EngineConfig, treasury: T) -> Self {
        Self {
            config,
            params: ParameterStore::new(GlobalParams::default()),
            markets: HashMap::new(),
            treasury,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
            system_suspended: false,
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        debug_assert!(timestamp >= self.current_time);
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn add_market(
        &mut self,
        market_id: MarketId,
        base_asset: &str,
        params: MarketParams,
    ) -> Result<MarketId, EngineError> {
        self.params.insert_market(market_id, params)?;
        let ledger = MarketLedger::new(market_id, base_asset, self.current_time);
        self.markets.insert(market_id, ledger);
        self.emit_event(EventPayload::MarketAdded(MarketAddedEvent {
            market_id,
            base_asset: base_asset.to_string(),
        }));
        Ok(market_id)
    }

    pub fn market(&self, market_id: MarketId) -> Option<&MarketLedger> {
        self.markets.get(&market_id)
    }

    pub fn position(&self, market_id: MarketId, account: AccountId) -> Option<&Position> {
        self.markets.get(&market_id).and_then(|m| m.position(account))
    }

    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.treasury
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    // suspension gates. policy lives outside; the engine only honors the flags.

    pub fn suspend_system(&mut self) {
        self.system_suspended = true;
    }

    pub fn resume_system(&mut self) {
        self.system_suspended = false;
    }

    pub fn suspend_market(&mut self, market_id: MarketId) -> Result<(), EngineError> {
        self.ledger_mut(market_id)?.status = MarketStatus::Suspended;
        Ok(())
    }

    pub fn resume_market(&mut self, market_id: MarketId) -> Result<(), EngineError> {
        self.ledger_mut(market_id)?.status = MarketStatus::Active;
        Ok(())
    }

    /// Accept a new oracle reading. round ids are strictly increasing; a replay
    /// or out-of-order push is refused.
    pub fn push_price(
        &mut self,
        market_id: MarketId,
        price: Price,
        round_id: u64,
        invalid: bool,
    ) -> Result<(), EngineError> {
        let now = self.current_time;
        let ledger = self.ledger_mut(market_id)?;
        if let Some(current) = &ledger.price {
            if !current.accepts_round(round_id) {
                return Err(EngineError::StaleRound {
                    market: market_id,
                    round: round_id,
                });
            }
        }
        ledger.price = Some(PriceReading::new(price, invalid, round_id, now));
        self.emit_event(EventPayload::PriceUpdated(PriceUpdatedEvent {
            market_id,
            price,
            round_id,
            invalid,
        }));
        Ok(())
    }

    // parameter writes. funding-relevant ones are two-phase: recompute funding at
    // the old parameters first, then apply, so accrued-but-unrecorded funding is
    // never retroactively repriced.

    pub fn set_max_funding_rate(
        &mut self,
        market_id: MarketId,
        rate: Decimal,
    ) -> Result<(), EngineError> {
        self.recompute_funding_if_priced(market_id)?;
        self.params.set_max_funding_rate(market_id, rate)?;
        self.emit_parameter_updated(Some(market_id), "max_funding_rate");
        Ok(())
    }

    pub fn set_skew_scale(
        &mut self,
        market_id: MarketId,
        skew_scale_usd: Decimal,
    ) -> Result<(), EngineError> {
        self.recompute_funding_if_priced(market_id)?;
        self.params.set_skew_scale(market_id, skew_scale_usd)?;
        self.emit_parameter_updated(Some(market_id), "skew_scale_usd");
        Ok(())
    }

    pub fn set_taker_fee(&mut self, market_id: MarketId, fee: Decimal) -> Result<(), EngineError> {
        self.params.set_taker_fee(market_id, fee)?;
        self.emit_parameter_updated(Some(market_id), "taker_fee");
        Ok(())
    }

    pub fn set_maker_fee(&mut self, market_id: MarketId, fee: Decimal) -> Result<(), EngineError> {
        self.params.set_maker_fee(market_id, fee)?;
        self.emit_parameter_updated(Some(market_id), "maker_fee");
        Ok(())
    }

    pub fn set_max_leverage(
        &mut self,
        market_id: MarketId,
        max_leverage: Decimal,
    ) -> Result<(), EngineError> {
        self.params.set_max_leverage(market_id, max_leverage)?;
        self.emit_parameter_updated(Some(market_id), "max_leverage");
        Ok(())
    }

    pub fn set_max_single_side_value(
        &mut self,
        market_id: MarketId,
        cap: Quote,
    ) -> Result<(), EngineError> {
        self.params.set_max_single_side_value(market_id, cap)?;
        self.emit_parameter_updated(Some(market_id), "max_single_side_value_usd");
        Ok(())
    }

    pub fn set_min_keeper_fee(&mut self, fee: Quote) -> Result<(), EngineError> {
        self.params.set_min_keeper_fee(fee)?;
        self.emit_parameter_updated(None, "min_keeper_fee");
        Ok(())
    }

    pub fn set_min_initial_margin(&mut self, margin: Quote) -> Result<(), EngineError> {
        self.params.set_min_initial_margin(margin)?;
        self.emit_parameter_updated(None, "min_initial_margin");
        Ok(())
    }

    pub fn set_liquidation_fee_ratio(&mut self, ratio: Decimal) -> Result<(), EngineError> {
        self.params.set_liquidation_fee_ratio(ratio)?;
        self.emit_parameter_updated(None, "liquidation_fee_ratio");
        Ok(())
    }

    pub fn set_liquidation_buffer_ratio(&mut self, ratio: Decimal) -> Result<(), EngineError> {
        self.params.set_liquidation_buffer_ratio(ratio)?;
        self.emit_parameter_updated(None, "liquidation_buffer_ratio");
        Ok(())
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // internal access and gate helpers

    pub(super) fn ledger(&self, market_id: MarketId) -> Result<&MarketLedger, EngineError> {
        self.markets
            .get(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    pub(super) fn ledger_mut(
        &mut self,
        market_id: MarketId,
    ) -> Result<&mut MarketLedger, EngineError> {
        self.markets
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    /// Suspension gates, checked before anything else (price validity included).
    pub(super) fn check_suspension(&self, market_id: MarketId) -> Result<(), EngineError> {
        if self.system_suspended {
            return Err(EngineError::SystemSuspended);
        }
        let ledger = self.ledger(market_id)?;
        if !ledger.is_active() {
            return Err(EngineError::MarketSuspended(market_id));
        }
        Ok(())
    }

    /// The current price, failing unless one has been pushed and it is valid.
    pub(super) fn valid_price(&self, market_id: MarketId) -> Result<Price, EngineError> {
        let ledger = self.ledger(market_id)?;
        match &ledger.price {
            Some(reading) if !reading.invalid => Ok(reading.price),
            _ => Err(EngineError::InvalidPrice(market_id)),
        }
    }

    pub(super) fn market_params(&self, market_id: MarketId) -> Result<MarketParams, EngineError> {
        self.params
            .market(market_id)
            .cloned()
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    /// A copy of the account's record (or a fresh unassigned one) plus the
    /// funding-sequence value at its back-reference. mutating operations
    /// validate against the copy so a rejection writes nothing.
    pub(super) fn snapshot_position(
        &self,
        market_id: MarketId,
        account: AccountId,
        price: Price,
    ) -> Result<(Position, Decimal), EngineError> {
        let ledger = self.ledger(market_id)?;
        let position = match ledger.position(account) {
            Some(existing) => existing.clone(),
            None => Position::new(
                PositionId::UNASSIGNED,
                ledger.latest_funding_index(),
                price,
            ),
        };
        let entry_funding = ledger.funding_at(position.last_funding_index);
        Ok((position, entry_funding))
    }

    /// A position's contribution to entry_debt_correction:
    /// margin - size * (last_price + funding at its back-reference).
    pub(super) fn debt_term(position: &Position, entry_funding: Decimal) -> Result<Decimal, EngineError> {
        let carried = mul_decimal(
            position.size.value(),
            position.last_price.value() + entry_funding,
        )?;
        Ok(position.margin.value() - carried)
    }

    pub(super) fn emit_parameter_updated(&mut self, market_id: Option<MarketId>, name: &'static str) {
        self.emit_event(EventPayload::ParameterUpdated(ParameterUpdatedEvent {
            market_id,
            name: name.to_string(),
        }));
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
