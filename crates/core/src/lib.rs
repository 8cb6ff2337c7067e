pub mod config;
pub mod config_loader;
pub mod error;
pub mod tick_math;
pub mod timescale;
pub mod traits;
pub mod types;

pub use config::{AppConfig, GatewayConfig, PairConfig, StrategyConfig};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use error::{DomainError, KeeperError, Result};
pub use tick_math::{
    absolute_price_to_adjusted_price, absolute_price_to_tick, adjusted_price_to_absolute_price,
    adjusted_price_to_tick, get_valid_tick, max_usable_tick, min_usable_tick,
    tick_to_absolute_price, tick_to_adjusted_price, MAX_TICK, MIN_TICK,
};
pub use timescale::{timescale_to_width, width_to_timescale, Timescale};
pub use traits::{
    ActionExecutor, CollateralOracle, PoolMetadata, PositionQuery, PriceFeed, SessionResolver,
    Venue,
};
pub use types::{
    BurnAndMintRequest, BurnRequest, CollateralQuery, CollateralReport, MintRequest, PoolSession,
    Position, PositionLeg, StraddleSpec, TickBracket, TickLadder, TokenId, TokenInfo, TxHandle,
    TxStatus,
};
pub use ethers::types::U256;
