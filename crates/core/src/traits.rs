use crate::error::Result;
use crate::types::{
    BurnAndMintRequest, BurnRequest, CollateralQuery, CollateralReport, MintRequest, PoolSession,
    PositionLeg, StraddleSpec, TickLadder, TokenId, TokenInfo, TxHandle, TxStatus,
};
use async_trait::async_trait;

/// Resolves the addresses a session needs before its first cycle.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn token_info(&self, symbol: &str) -> Result<TokenInfo>;

    async fn uniswap_pool(&self, token0: &TokenInfo, token1: &TokenInfo, fee: u32) -> Result<String>;

    async fn panoptic_pool(&self, uniswap_pool: &str) -> Result<String>;
}

#[async_trait]
pub trait PoolMetadata: Send + Sync {
    /// Tick spacing and ascending initialized ticks of a Uniswap pool.
    async fn tick_spacing_and_ladder(&self, uniswap_pool: &str) -> Result<(i32, TickLadder)>;
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Decimals-adjusted spot price of the session's pool.
    async fn spot_price(&self, session: &PoolSession) -> Result<f64>;
}

#[async_trait]
pub trait PositionQuery: Send + Sync {
    async fn open_positions(&self, panoptic_pool: &str) -> Result<Vec<TokenId>>;

    async fn unwrap_position(&self, token_id: &TokenId) -> Result<Vec<PositionLeg>>;
}

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Encodes a straddle token id. No transaction is sent.
    async fn create_straddle(&self, spec: &StraddleSpec) -> Result<TokenId>;

    async fn mint(&self, request: &MintRequest) -> Result<TxHandle>;

    async fn burn(&self, request: &BurnRequest) -> Result<TxHandle>;

    async fn burn_and_mint(&self, request: &BurnAndMintRequest) -> Result<TxHandle>;

    async fn transaction_status(&self, handle: &TxHandle) -> Result<TxStatus>;
}

#[async_trait]
pub trait CollateralOracle: Send + Sync {
    async fn check_collateral(&self, query: &CollateralQuery) -> Result<CollateralReport>;
}

/// Everything the keeper calls out to.
pub trait Venue:
    SessionResolver + PoolMetadata + PriceFeed + PositionQuery + ActionExecutor + CollateralOracle
{
}

impl<T> Venue for T where
    T: SessionResolver + PoolMetadata + PriceFeed + PositionQuery + ActionExecutor + CollateralOracle
{
}
