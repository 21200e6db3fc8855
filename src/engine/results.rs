// 12.0.2: result types and errors for engine operations.

use crate::fixed::MathError;
use crate::params::ParamsError;
use crate::trade::TradeStatus;
use crate::types::{AccountId, MarketId, PositionId, Price, Quote, SignedSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub id: PositionId,
    pub margin: Quote,
    pub size: SignedSize,
    pub trade_size: Decimal,
    pub fee: Quote,
    pub price: Price,
}

#[derive(Debug, Clone)]
pub struct MarginTransferOutcome {
    pub id: PositionId,
    pub requested: Quote,
    /// Signed amount actually applied. deposits can realize less than requested
    /// when the treasury reports burn reclamation.
    pub realized: Quote,
    pub new_margin: Quote,
}

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub id: PositionId,
    pub account: AccountId,
    pub liquidator: AccountId,
    pub size: SignedSize,
    pub price: Price,
    pub fee: Quote,
    pub pool_share: Quote,
}

/// Market-wide aggregates at the current price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub market_id: MarketId,
    pub price: Price,
    pub market_size: Decimal,
    pub market_skew: Decimal,
    pub market_debt: Quote,
    pub current_funding_rate: Decimal,
    pub unrecorded_funding: Decimal,
    pub price_invalid: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketSizes {
    pub long: Decimal,
    pub short: Decimal,
}

/// Derived view of one position. remaining_margin is reported signed for
/// diagnostics; decisions inside the engine use the floored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    pub id: PositionId,
    pub size: SignedSize,
    pub margin: Quote,
    pub profit_loss: Quote,
    pub accrued_funding: Quote,
    pub remaining_margin: Quote,
    pub accessible_margin: Quote,
    pub can_liquidate: bool,
    pub approx_liquidation_price: Option<Price>,
    pub approx_liquidation_fee: Option<Quote>,
    pub price_invalid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("system is suspended")]
    SystemSuspended,

    #[error("market {0:?} is suspended")]
    MarketSuspended(MarketId),

    #[error("market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("price for market {0:?} is invalid or missing")]
    InvalidPrice(MarketId),

    #[error("round {round} for market {market:?} is not newer than the stored round")]
    StaleRound { market: MarketId, round: u64 },

    #[error("insufficient margin")]
    InsufficientMargin,

    #[error("max leverage exceeded")]
    MaxLeverageExceeded,

    #[error("max market value exceeded")]
    MaxMarketSizeExceeded,

    #[error("nil order")]
    NilOrder,

    #[error("no open position")]
    NoPositionOpen,

    #[error("no position record for that account")]
    NoSuchPosition,

    #[error("position cannot be liquidated")]
    PositionNotLiquidatable,

    #[error("position is liquidatable; liquidation is the only exit")]
    CanLiquidate,

    #[error("position has zero size")]
    ZeroSizePosition,

    #[error("parameter error: {0}")]
    Params(#[from] ParamsError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

impl EngineError {
    /// Map a rejected trade projection onto the error taxonomy.
    pub(super) fn from_trade_status(status: TradeStatus) -> Option<Self> {
        match status {
            TradeStatus::Ok => None,
            TradeStatus::NilOrder => Some(Self::NilOrder),
            TradeStatus::InsufficientMargin => Some(Self::InsufficientMargin),
            TradeStatus::MaxLeverageExceeded => Some(Self::MaxLeverageExceeded),
            TradeStatus::MaxMarketSizeExceeded => Some(Self::MaxMarketSizeExceeded),
            TradeStatus::CanLiquidate => Some(Self::CanLiquidate),
        }
    }
}
