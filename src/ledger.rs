// 5.0: the position ledger. durable per-account position records, the market-wide
// funding sequence, and the O(1) debt aggregates. pure storage with
// invariant-preserving mutators; all pricing/fee decisions live elsewhere.
//
// records are never deleted. closing or liquidating a position resets margin/size
// but keeps the record and its id, so a later reopen reuses the same numeric id.

use crate::oracle::PriceReading;
use crate::types::{AccountId, MarketId, Price, PositionId, Quote, SignedSize, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Active,
    /// Trading gated off by policy. state is retained; markets are never deleted.
    Suspended,
}

impl Default for MarketStatus {
    fn default() -> Self {
        Self::Active
    }
}

// 5.1: one per (market, account). id is assigned on first touch and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    /// Index into the funding sequence observed at last touch.
    pub last_funding_index: usize,
    /// Collateral currently allocated. never negative.
    pub margin: Quote,
    /// Margin reserved against pending obligations; unavailable for withdrawal.
    pub locked_margin: Quote,
    /// Price at last touch; PnL since then is size * (price - last_price).
    pub last_price: Price,
    pub size: SignedSize,
}

impl Position {
    pub fn new(id: PositionId, funding_index: usize, price: Price) -> Self {
        Self {
            id,
            last_funding_index: funding_index,
            margin: Quote::zero(),
            locked_margin: Quote::zero(),
            last_price: price,
            size: SignedSize::zero(),
        }
    }

    /// size == 0 means closed; margin left in the record is withdrawable balance.
    pub fn is_open(&self) -> bool {
        !self.size.is_zero()
    }
}

// 5.2: one entry per funding recompute. funding is the cumulative net funding in
// quote units per unit of position size since market genesis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FundingEntry {
    pub funding: Decimal,
    pub timestamp: Timestamp,
}

/// Market-wide runtime state: aggregates, funding sequence, position records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketLedger {
    pub market_id: MarketId,
    /// Symbol of the price feed this market tracks (e.g. "BTC").
    pub base_asset: String,
    pub status: MarketStatus,
    /// Sum of |size| over all positions.
    pub market_size: Decimal,
    /// Sum of signed size over all positions. positive = net long.
    pub market_skew: Decimal,
    /// Running correction term so market debt is computable without iterating
    /// positions: debt = skew * (price + funding) + entry_debt_correction.
    pub entry_debt_correction: Decimal,
    pub funding_sequence: Vec<FundingEntry>,
    pub funding_last_recomputed: Timestamp,
    /// Latest oracle reading, if any has been pushed.
    pub price: Option<PriceReading>,
    last_position_id: u64,
    positions: HashMap<AccountId, Position>,
    position_id_to_account: HashMap<PositionId, AccountId>,
}

impl MarketLedger {
    pub fn new(market_id: MarketId, base_asset: &str, timestamp: Timestamp) -> Self {
        // index 0 is seeded to zero so every back-reference has a base entry
        let genesis = FundingEntry {
            funding: Decimal::ZERO,
            timestamp,
        };
        Self {
            market_id,
            base_asset: base_asset.to_string(),
            status: MarketStatus::Active,
            market_size: Decimal::ZERO,
            market_skew: Decimal::ZERO,
            entry_debt_correction: Decimal::ZERO,
            funding_sequence: vec![genesis],
            funding_last_recomputed: timestamp,
            price: None,
            last_position_id: 0,
            positions: HashMap::new(),
            position_id_to_account: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    pub fn latest_funding_index(&self) -> usize {
        self.funding_sequence.len() - 1
    }

    pub fn latest_funding(&self) -> Decimal {
        self.funding_sequence[self.latest_funding_index()].funding
    }

    pub fn funding_at(&self, index: usize) -> Decimal {
        self.funding_sequence[index].funding
    }

    /// Append a funding entry. timestamps are monotonically non-decreasing.
    pub fn push_funding_entry(&mut self, funding: Decimal, timestamp: Timestamp) -> usize {
        debug_assert!(timestamp >= self.funding_last_recomputed);
        self.funding_sequence.push(FundingEntry { funding, timestamp });
        self.funding_last_recomputed = timestamp;
        self.latest_funding_index()
    }

    pub fn position(&self, account: AccountId) -> Option<&Position> {
        self.positions.get(&account)
    }

    pub fn position_mut(&mut self, account: AccountId) -> Option<&mut Position> {
        self.positions.get_mut(&account)
    }

    pub fn positions_iter(&self) -> impl Iterator<Item = (&AccountId, &Position)> {
        self.positions.iter()
    }

    pub fn account_for_position(&self, id: PositionId) -> Option<AccountId> {
        self.position_id_to_account.get(&id).copied()
    }

    pub fn last_position_id(&self) -> u64 {
        self.last_position_id
    }

    /// Fetch or create the record for `account`, assigning its permanent id on the
    /// first-ever touch.
    pub fn touch_position(&mut self, account: AccountId, price: Price) -> &mut Position {
        let funding_index = self.latest_funding_index();
        let entry = self.positions.entry(account).or_insert_with(|| {
            Position::new(PositionId::UNASSIGNED, funding_index, price)
        });
        if !entry.id.is_assigned() {
            self.last_position_id += 1;
            entry.id = PositionId(self.last_position_id);
            self.position_id_to_account.insert(entry.id, account);
        }
        entry
    }

    /// Update the size aggregates for a position going old_size -> new_size.
    pub fn apply_size_delta(&mut self, old_size: SignedSize, new_size: SignedSize) {
        self.market_size += new_size.abs() - old_size.abs();
        self.market_skew += new_size.value() - old_size.value();
        debug_assert!(self.market_size >= Decimal::ZERO);
        debug_assert!(self.market_skew.abs() <= self.market_size);
    }

    pub fn add_debt_correction(&mut self, delta: Decimal) {
        self.entry_debt_correction += delta;
    }

    /// Long-side open size: (market_size + market_skew) / 2.
    pub fn long_side_size(&self) -> Decimal {
        (self.market_size + self.market_skew) / dec!(2)
    }

    /// Short-side open size: (market_size - market_skew) / 2.
    pub fn short_side_size(&self) -> Decimal {
        (self.market_size - self.market_skew) / dec!(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger() -> MarketLedger {
        MarketLedger::new(MarketId(1), "BTC", Timestamp::from_millis(0))
    }

    #[test]
    fn funding_sequence_seeded_with_zero() {
        let ledger = ledger();
        assert_eq!(ledger.funding_sequence.len(), 1);
        assert_eq!(ledger.latest_funding_index(), 0);
        assert_eq!(ledger.latest_funding(), Decimal::ZERO);
    }

    #[test]
    fn ids_assigned_once_and_monotonic() {
        let mut ledger = ledger();
        let price = Price::new_unchecked(dec!(100));

        let id_a = ledger.touch_position(AccountId(7), price).id;
        let id_b = ledger.touch_position(AccountId(8), price).id;
        assert_eq!(id_a, PositionId(1));
        assert_eq!(id_b, PositionId(2));

        // touching again keeps the same id
        let id_a2 = ledger.touch_position(AccountId(7), price).id;
        assert_eq!(id_a2, id_a);

        assert_eq!(ledger.account_for_position(id_a), Some(AccountId(7)));
        assert_eq!(ledger.account_for_position(id_b), Some(AccountId(8)));
    }

    #[test]
    fn aggregates_track_size_changes() {
        let mut ledger = ledger();

        ledger.apply_size_delta(SignedSize::zero(), SignedSize::new(dec!(50)));
        ledger.apply_size_delta(SignedSize::zero(), SignedSize::new(dec!(-20)));

        assert_eq!(ledger.market_size, dec!(70));
        assert_eq!(ledger.market_skew, dec!(30));
        assert_eq!(ledger.long_side_size(), dec!(50));
        assert_eq!(ledger.short_side_size(), dec!(20));

        // closing the short brings the skew back to the long side only
        ledger.apply_size_delta(SignedSize::new(dec!(-20)), SignedSize::zero());
        assert_eq!(ledger.market_size, dec!(50));
        assert_eq!(ledger.market_skew, dec!(50));
    }

    #[test]
    fn funding_entries_append_with_timestamps() {
        let mut ledger = ledger();
        let idx = ledger.push_funding_entry(dec!(-0.5), Timestamp::from_millis(1000));
        assert_eq!(idx, 1);
        assert_eq!(ledger.latest_funding(), dec!(-0.5));
        assert_eq!(ledger.funding_last_recomputed, Timestamp::from_millis(1000));
    }
}
