// 4.0: oracle price readings. the oracle itself is an external collaborator; it
// pushes (price, invalid, round_id) per market and the engine keeps the latest
// reading. round ids are monotonically increasing; an out-of-order push is refused
// so a replayed round can never roll price back.

use crate::types::{Price, Timestamp};
use serde::{Deserialize, Serialize};

/// Latest oracle reading for one market.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceReading {
    pub price: Price,
    /// Stale/invalid flag as reported by the oracle. no mutation may run on an
    /// invalid price.
    pub invalid: bool,
    pub round_id: u64,
    pub received_at: Timestamp,
}

impl PriceReading {
    pub fn new(price: Price, invalid: bool, round_id: u64, received_at: Timestamp) -> Self {
        Self {
            price,
            invalid,
            round_id,
            received_at,
        }
    }

    /// True when a new reading with `round_id` may replace this one.
    pub fn accepts_round(&self, round_id: u64) -> bool {
        round_id > self.round_id
    }
}
