//! Domain types shared by the keeper and its collaborators.

use std::fmt;
use std::str::FromStr;

use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// =============================================================================
// Positions
// =============================================================================

/// Panoptic position identifier (a packed 256-bit token id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub U256);

impl TokenId {
    #[must_use]
    pub const fn new(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = String;

    /// Parses `0x`-prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| e.to_string()),
            None => U256::from_dec_str(s).map_err(|e| e.to_string()),
        };
        parsed
            .map(Self)
            .map_err(|e| format!("invalid token id '{s}': {e}"))
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

/// One leg of a Panoptic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLeg {
    /// Which token the option is denominated in (0 or 1).
    pub asset: u8,
    /// Long (purchased) or short (sold) liquidity.
    pub is_long: bool,
    /// Token moved at expiry (0 = token0 / put side, 1 = token1 / call side).
    pub token_type: u8,
    pub option_ratio: u8,
    pub risk_partner: u8,
    /// Centre of the leg's tick range.
    pub strike: i32,
    /// Width in tick-spacing units.
    pub width: i32,
}

impl PositionLeg {
    /// Tick range `(strike_low, strike_high)` covered by the leg.
    ///
    /// Computed in `f64` because `width * tick_spacing` may be odd.
    #[must_use]
    pub fn strike_bounds(&self, tick_spacing: i32) -> (f64, f64) {
        let half = f64::from(self.width) * f64::from(tick_spacing) / 2.0;
        let strike = f64::from(self.strike);
        (strike - half, strike + half)
    }
}

/// A held position and its legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub token_id: TokenId,
    pub legs: Vec<PositionLeg>,
}

/// Parameters for encoding a single-leg straddle token id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StraddleSpec {
    pub uniswap_pool: String,
    /// Width in tick-spacing units.
    pub width: i32,
    pub strike: i32,
    pub asset: u8,
    pub is_long: bool,
    pub option_ratio: u8,
    pub start: u8,
}

impl StraddleSpec {
    /// Centred short straddle on asset 0 with ratio 1.
    #[must_use]
    pub fn short(uniswap_pool: impl Into<String>, strike: i32, width: i32) -> Self {
        Self {
            uniswap_pool: uniswap_pool.into(),
            width,
            strike,
            asset: 0,
            is_long: false,
            option_ratio: 1,
            start: 0,
        }
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Ascending initialized ticks of a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickLadder {
    ticks: Vec<i32>,
}

/// Ladder entries surrounding a tick: `lower <= tick < upper`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBracket {
    /// Greatest ladder tick `<=` the target, if any.
    pub lower: Option<i32>,
    /// Ladder tick following `lower` (the first tick when `lower` is missing).
    pub upper: Option<i32>,
}

impl TickBracket {
    /// Both edges known.
    #[must_use]
    pub const fn bounds(&self) -> Option<(i32, i32)> {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => Some((lower, upper)),
            _ => None,
        }
    }
}

impl TickLadder {
    /// Builds a ladder, rejecting entries that are not strictly ascending.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnorderedLadder`] with the first offending index.
    pub fn new(ticks: Vec<i32>) -> Result<Self, DomainError> {
        if let Some(index) = ticks.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DomainError::UnorderedLadder { index: index + 1 });
        }
        Ok(Self { ticks })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[i32] {
        &self.ticks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Brackets a real-valued tick between ladder entries.
    #[must_use]
    pub fn bracket(&self, target: f64) -> TickBracket {
        let idx = self.ticks.partition_point(|&t| f64::from(t) <= target);
        TickBracket {
            lower: idx.checked_sub(1).map(|i| self.ticks[i]),
            upper: self.ticks.get(idx).copied(),
        }
    }

    /// Ladder tick nearest to `target`; ties resolve to the lower tick.
    #[must_use]
    pub fn closest(&self, target: f64) -> Option<i32> {
        let bracket = self.bracket(target);
        match (bracket.lower, bracket.upper) {
            (Some(lower), Some(upper)) => {
                if target - f64::from(lower) <= f64::from(upper) - target {
                    Some(lower)
                } else {
                    Some(upper)
                }
            }
            (lower, upper) => lower.or(upper),
        }
    }
}

/// ERC-20 token resolved by symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

/// Pool facts resolved once at startup and fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSession {
    pub wallet_address: String,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
    /// Uniswap fee tier in hundredths of a bip (500, 3000, 10000).
    pub fee: u32,
    pub uniswap_pool: String,
    pub panoptic_pool: String,
    pub tick_spacing: i32,
    pub ladder: TickLadder,
}

// =============================================================================
// Actions
// =============================================================================

/// Mint a position list that includes the new token id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub panoptic_pool: String,
    /// Full position list after the mint; the new id is last.
    pub position_id_list: Vec<TokenId>,
    pub position_size: U256,
    pub effective_liquidity_limit: U256,
}

/// Burn one token id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRequest {
    pub panoptic_pool: String,
    pub burn_token_id: TokenId,
    /// Position list remaining after the burn.
    pub new_position_id_list: Vec<TokenId>,
    pub tick_limit_low: i32,
    pub tick_limit_high: i32,
}

/// Burn one token id and mint another in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnAndMintRequest {
    pub panoptic_pool: String,
    pub burn_token_id: TokenId,
    pub postburn_position_id_list: Vec<TokenId>,
    pub mint_token_id: TokenId,
    pub position_size: U256,
    pub effective_liquidity_limit: U256,
    pub burn_tick_limit_low: i32,
    pub burn_tick_limit_high: i32,
    pub mint_tick_limit_low: i32,
    pub mint_tick_limit_high: i32,
}

/// Submitted transaction, pollable for status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub tx_hash: String,
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tx_hash)
    }
}

/// Transaction status reported by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Collateral check for a prospective position list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralQuery {
    pub panoptic_pool: String,
    /// Ladder tick nearest the spot tick.
    pub at_tick: i32,
    pub position_id_list: Vec<TokenId>,
}

/// Collateral balances versus requirements, in token base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralReport {
    pub balance0: U256,
    pub balance1: U256,
    pub required0: U256,
    pub required1: U256,
}

impl CollateralReport {
    /// First token whose balance is below its requirement, as
    /// `(token, balance, required)`.
    #[must_use]
    pub fn shortfall(&self) -> Option<(u8, U256, U256)> {
        if self.balance0 < self.required0 {
            Some((0, self.balance0, self.required0))
        } else if self.balance1 < self.required1 {
            Some((1, self.balance1, self.required1))
        } else {
            None
        }
    }
}
