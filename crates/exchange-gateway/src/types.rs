//! Wire types for the Gateway `options/*` and `network/poll` endpoints.
//!
//! Request structs serialize to the camelCase bodies the Gateway expects.
//! Response structs are deliberately loose (numbers may arrive as JSON
//! numbers, numeric strings, or ethers `{"hex": "0x.."}` objects) and are
//! converted into domain types with explicit validation.

use range_keeper_core::{PositionLeg, TokenId, TxStatus, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
// Loose numerics
// =============================================================================

/// A 256-bit quantity as the Gateway serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BigNumberish {
    /// ethers `BigNumber` JSON: `{"type": "BigNumber", "hex": "0x.."}`.
    Hex { hex: String },
    /// `0x`-prefixed hex or decimal string.
    Text(String),
    Number(u64),
}

impl BigNumberish {
    /// # Errors
    ///
    /// Returns a description of the value if it is not a valid 256-bit integer.
    pub fn to_u256(&self) -> Result<U256, String> {
        match self {
            Self::Hex { hex } => parse_hex(hex),
            Self::Text(text) => text.parse::<TokenId>().map(|id| id.0),
            Self::Number(n) => Ok(U256::from(*n)),
        }
    }
}

fn parse_hex(hex: &str) -> Result<U256, String> {
    let digits = hex
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| format!("BigNumber hex '{hex}' lacks 0x prefix"))?;
    U256::from_str_radix(digits, 16).map_err(|e| format!("BigNumber hex '{hex}': {e}"))
}

/// Small integer that may be a number, a numeric string, or a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Numberish {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Numberish {
    /// # Errors
    ///
    /// Returns a description of the value if it is not an integer.
    pub fn as_i64(&self) -> Result<i64, String> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Text(s) => match s.trim() {
                "true" => Ok(1),
                "false" => Ok(0),
                other => other
                    .parse::<i64>()
                    .map_err(|e| format!("'{s}' is not an integer: {e}")),
            },
        }
    }

    fn narrow<T: TryFrom<i64>>(&self, field: &str) -> Result<T, String> {
        let value = self.as_i64().map_err(|e| format!("{field}: {e}"))?;
        T::try_from(value).map_err(|_| format!("{field}: {value} out of range"))
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Fields shared by every Gateway request.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a, B: Serialize> {
    pub chain: &'a str,
    pub network: &'a str,
    pub connector: &'a str,
    pub address: &'a str,
    #[serde(flatten)]
    pub body: &'a B,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenAddressRequest<'a> {
    pub token_symbol: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckUniswapPoolRequest<'a> {
    pub t0_address: &'a str,
    pub t1_address: &'a str,
    pub fee: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct UniswapPoolRequest<'a> {
    #[serde(rename = "uniswapV3PoolAddress")]
    pub uniswap_pool: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpotPriceRequest<'a> {
    #[serde(rename = "uniswapV3PoolAddress")]
    pub uniswap_pool: &'a str,
    #[serde(rename = "token0Decimals")]
    pub token0_decimals: u8,
    #[serde(rename = "token1Decimals")]
    pub token1_decimals: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PanopticPoolRequest<'a> {
    pub panoptic_pool: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UnwrapTokenIdRequest {
    pub token_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateStraddleRequest<'a> {
    pub univ3pool: &'a str,
    pub width: i32,
    pub strike: i32,
    pub asset: u8,
    pub is_long: u8,
    pub option_ratio: u8,
    pub start: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckCollateralRequest<'a> {
    pub panoptic_pool: &'a str,
    pub at_tick: i32,
    pub position_id_list: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MintRequestBody<'a> {
    pub panoptic_pool: &'a str,
    pub position_id_list: Vec<String>,
    pub position_size: String,
    pub effective_liquidity_limit: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BurnRequestBody<'a> {
    pub panoptic_pool: &'a str,
    pub burn_token_id: String,
    pub new_position_id_list: Vec<String>,
    pub tick_limit_low: i32,
    pub tick_limit_high: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BurnAndMintRequestBody<'a> {
    pub panoptic_pool: &'a str,
    pub burn_token_id: String,
    pub postburn_position_id_list: Vec<String>,
    pub mint_token_id: String,
    pub position_size: String,
    pub effective_liquidity_limit: String,
    pub burn_tick_limit_low: i32,
    pub burn_tick_limit_high: i32,
    pub mint_tick_limit_low: i32,
    pub mint_tick_limit_high: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PollRequest<'a> {
    pub tx_hash: &'a str,
}

/// Hex strings, the form the Gateway accepts for id lists.
pub(crate) fn id_list(ids: &[TokenId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAddressResponse {
    pub token_address: String,
    pub token_decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniswapPoolResponse {
    #[serde(rename = "uniswapV3PoolAddress")]
    pub uniswap_pool: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanopticPoolResponse {
    #[serde(rename = "panopticPoolAddress")]
    pub panoptic_pool: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPriceResponse {
    pub spot_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSpacingResponse {
    pub tick_spacing: i32,
    pub ticks: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPositionsResponse {
    #[serde(default)]
    pub open_position_id_list: Vec<BigNumberish>,
}

/// One leg as reported by `options/unwrapTokenId`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLeg {
    pub asset: Numberish,
    pub is_long: Numberish,
    pub token_type: Numberish,
    pub option_ratio: Numberish,
    pub risk_partner: Numberish,
    pub strike: Numberish,
    pub width: Numberish,
}

impl TryFrom<&RawLeg> for PositionLeg {
    type Error = String;

    fn try_from(raw: &RawLeg) -> Result<Self, Self::Error> {
        let is_long: i64 = raw.is_long.as_i64().map_err(|e| format!("isLong: {e}"))?;
        Ok(Self {
            asset: raw.asset.narrow("asset")?,
            is_long: is_long != 0,
            token_type: raw.token_type.narrow("tokenType")?,
            option_ratio: raw.option_ratio.narrow("optionRatio")?,
            risk_partner: raw.risk_partner.narrow("riskPartner")?,
            strike: raw.strike.narrow("strike")?,
            width: raw.width.narrow("width")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnwrapTokenIdResponse {
    pub number_of_legs: usize,
    #[serde(default)]
    pub leg_info: Vec<RawLeg>,
}

impl UnwrapTokenIdResponse {
    /// Converts the first `numberOfLegs` legs.
    ///
    /// # Errors
    ///
    /// Returns a description if fewer legs than announced are present or a
    /// leg field is not a valid integer.
    pub fn legs(&self) -> Result<Vec<PositionLeg>, String> {
        if self.leg_info.len() < self.number_of_legs {
            return Err(format!(
                "numberOfLegs is {} but legInfo has {} entries",
                self.number_of_legs,
                self.leg_info.len()
            ));
        }
        self.leg_info[..self.number_of_legs]
            .iter()
            .map(PositionLeg::try_from)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionResponse {
    pub token_id: BigNumberish,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCollateralResponse {
    pub collateral_balance0: BigNumberish,
    pub collateral_balance1: BigNumberish,
    pub required_collateral0: BigNumberish,
    pub required_collateral1: BigNumberish,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub tx_status: i64,
}

impl PollResponse {
    /// `1` is mined successfully; `-1`, `0` and `2` are still pending.
    #[must_use]
    pub const fn status(&self) -> TxStatus {
        match self.tx_status {
            1 => TxStatus::Success,
            -1 | 0 | 2 => TxStatus::Pending,
            _ => TxStatus::Failed,
        }
    }
}
