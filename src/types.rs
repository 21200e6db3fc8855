// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, signed sizes, prices, quote amounts, timestamps. each is a newtype so the
// compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

// 1.1: position ids are assigned lazily on first touch and never reused.
// PositionId(0) means "not yet assigned".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl PositionId {
    pub const UNASSIGNED: PositionId = PositionId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

// 1.2: signed size: positive = long, negative = short. core to all position math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedSize(Decimal);

impl SignedSize {
    pub fn new(size: Decimal) -> Self {
        Self(size)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn abs(&self) -> Decimal {
        self.0.abs()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn add(&self, delta: Decimal) -> Self {
        Self(self.0 + delta)
    }

    pub fn negate(&self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for SignedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: price in quote currency per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: settlement-asset amount. margin, pnl, fees, funding all use this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn add(&self, other: Quote) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: Quote) -> Self {
        Self(self.0 - other.0)
    }

    pub fn negate(&self) -> Self {
        Self(-self.0)
    }

    /// Floor at zero. remaining-margin and debt views use this.
    pub fn clamp_non_negative(&self) -> Self {
        Self(self.0.max(Decimal::ZERO))
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Quote {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(q))
    }
}

impl<'a> Sum<&'a Quote> for Quote {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(*q))
    }
}

// 1.5: millisecond timestamp. funding accrual is prorated by elapsed days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

pub const MILLIS_PER_DAY: i64 = 86_400_000;

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn elapsed_days(&self, later: &Timestamp) -> Decimal {
        let diff_ms = (later.0 - self.0).max(0);
        Decimal::new(diff_ms, 0) / Decimal::new(MILLIS_PER_DAY, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn signed_size_operations() {
        let long = SignedSize::new(dec!(10));
        assert!(long.is_long());
        assert_eq!(long.abs(), dec!(10));

        let short = SignedSize::new(dec!(-10));
        assert!(short.is_short());
        assert_eq!(short.abs(), dec!(10));
        assert_eq!(short.value(), dec!(-10));
    }

    #[test]
    fn quote_default_is_zero() {
        assert_eq!(Quote::default(), Quote::zero());
    }

    #[test]
    fn position_id_assignment_flag() {
        assert!(!PositionId::UNASSIGNED.is_assigned());
        assert!(PositionId(1).is_assigned());
    }

    #[test]
    fn elapsed_days_proration() {
        let t0 = Timestamp::from_millis(0);
        let t1 = Timestamp::from_millis(MILLIS_PER_DAY / 2);
        assert_eq!(t0.elapsed_days(&t1), dec!(0.5));

        // clock going backwards reads as zero elapsed
        assert_eq!(t1.elapsed_days(&t0), Decimal::ZERO);
    }

    #[test]
    fn quote_floor() {
        assert_eq!(Quote::new(dec!(-5)).clamp_non_negative(), Quote::zero());
        assert_eq!(Quote::new(dec!(5)).clamp_non_negative(), Quote::new(dec!(5)));
    }
}
