// skewperp-core: perpetual futures accounting engine.
// skew-funded design: the funding rate is a pure function of market skew, and
// funding accrual is pulled lazily through a cumulative sequence instead of
// being settled per position. all computation is deterministic with no
// external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, AccountId, PositionId, Price, Quote
//   2.x  fixed.rs: checked decimal arithmetic, 18-place truncation
//   3.x  params.rs: per-market and global risk parameters, validation
//   4.x  oracle.rs: price readings, round-id monotonicity
//   5.x  ledger.rs: position records, funding sequence, debt aggregates
//   6.x  funding.rs: proportional skew, rate cap, lazy accrual math
//   7.x  margin.rs: pnl, remaining/accessible margin, leverage
//   8.x  liquidation.rs: liquidation margin, eligibility, approx price
//   9.x  trade.rs: trade projection, fee selection, check ordering
//   10.x treasury.rs: settlement-asset boundary (mocked in-memory impl)
//   11.x events.rs: state transition events for audit
//   12.x engine/: orchestration: margin transfers, trades, liquidations,
//        funding recomputes, parameter writes, read views

// accounting modules
pub mod fixed;
pub mod funding;
pub mod ledger;
pub mod liquidation;
pub mod margin;
pub mod trade;
pub mod types;

// orchestration and integration modules
pub mod engine;
pub mod events;
pub mod oracle;
pub mod params;
pub mod treasury;

// re exports for convenience
pub use engine::{
    Engine, EngineConfig, EngineError, LiquidationOutcome, MarginTransferOutcome, MarketSizes,
    MarketSummary, PositionSummary, TradeOutcome,
};
pub use events::{Event, EventId, EventPayload};
pub use ledger::{FundingEntry, MarketLedger, MarketStatus, Position};
pub use oracle::PriceReading;
pub use params::{GlobalParams, MarketParams, ParamsError};
pub use trade::{TradeProjection, TradeStatus};
pub use treasury::{InMemoryTreasury, Treasury};
pub use types::{AccountId, MarketId, PositionId, Price, Quote, SignedSize, Timestamp};
