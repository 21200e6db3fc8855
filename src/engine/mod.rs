// 12.0: the orchestrating state machine. one mutating call per logical operation,
// serialized per market through &mut self; every operation validates against a
// staged funding recompute and only writes on success, so failures leave zero
// state change (funding sequence included).

mod config;
mod core;
mod funding;
mod liquidations;
mod margin;
mod results;
mod trades;
mod views;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{
    EngineError, LiquidationOutcome, MarginTransferOutcome, MarketSizes, MarketSummary,
    PositionSummary, TradeOutcome,
};
