// 11.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists all
// event types.

use crate::types::{AccountId, MarketId, PositionId, Price, Quote, SignedSize, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // margin/trade events
    MarginModified(MarginModifiedEvent),
    PositionModified(PositionModifiedEvent),
    PositionLiquidated(PositionLiquidatedEvent),

    // funding events
    FundingRecomputed(FundingRecomputedEvent),

    // market data / admin events
    MarketAdded(MarketAddedEvent),
    PriceUpdated(PriceUpdatedEvent),
    ParameterUpdated(ParameterUpdatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginModifiedEvent {
    pub market_id: MarketId,
    pub account: AccountId,
    /// Realized transfer amount, signed. may be less than requested on deposit
    /// when the treasury reports burn reclamation.
    pub delta: Quote,
    pub new_margin: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionModifiedEvent {
    pub market_id: MarketId,
    pub id: PositionId,
    pub account: AccountId,
    pub margin: Quote,
    pub size: SignedSize,
    pub trade_size: Decimal,
    pub price: Price,
    pub fee: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub market_id: MarketId,
    pub id: PositionId,
    pub account: AccountId,
    pub liquidator: AccountId,
    pub size: SignedSize,
    pub price: Price,
    pub fee: Quote,
    /// Remaining margin routed to the fee pool after the keeper fee.
    pub pool_share: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRecomputedEvent {
    pub market_id: MarketId,
    pub index: usize,
    pub funding: Decimal,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketAddedEvent {
    pub market_id: MarketId,
    pub base_asset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    pub market_id: MarketId,
    pub price: Price,
    pub round_id: u64,
    pub invalid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterUpdatedEvent {
    pub market_id: Option<MarketId>,
    pub name: String,
}
