//! Gateway integration for the range keeper.
//!
//! This crate provides:
//! - REST client with rate limiting for the Gateway `options/*` endpoints
//! - Typed request/response models with tolerant numeric decoding
//! - Implementations of every collaborator trait the keeper depends on
//!
//! # Endpoints
//!
//! - `POST options/getTokenAddress` - Token address and decimals by symbol
//! - `POST options/checkUniswapPool` - Uniswap V3 pool for a pair and fee tier
//! - `POST options/getPanopticPool` - Panoptic pool for a Uniswap pool
//! - `POST options/getTickSpacingAndInitializedTicks` - Tick spacing and ladder
//! - `POST options/getSpotPrice` - Decimals-adjusted spot price
//! - `POST options/queryPositions` - Open position ids of the wallet
//! - `POST options/unwrapTokenId` - Legs of a position
//! - `POST options/createStraddle` - Token id encoding (no transaction)
//! - `POST options/checkCollateral` - Collateral balances and requirements
//! - `POST options/mint`, `options/burn`, `options/burnAndMint` - Submissions
//! - `POST network/poll` - Transaction status

pub mod client;
pub mod types;
pub mod venue;

pub use client::{GatewayClient, GatewayClientConfig, DEFAULT_GATEWAY_URL};
pub use types::{BigNumberish, Numberish};
