use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::error::{KeeperError, Result};
use crate::timescale::Timescale;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub pair: PairConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub chain: String,
    pub network: String,
    pub connector: String,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
    /// Attempts for read-only calls, including the first.
    pub read_retry_attempts: u32,
    pub read_retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    pub token0: String,
    pub token1: String,
    /// Uniswap fee tier: 500, 3000 or 10000.
    pub fee: u32,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub poll_interval_secs: u64,
    pub default_timescale: Timescale,
    /// Position size as a decimal integer string (256-bit).
    pub position_size: String,
    pub effective_liquidity_limit: String,
    pub use_burn_and_mint: bool,
    pub confirmation_poll_ms: u64,
    pub max_confirmation_polls: u32,
    pub spot_log_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:15888".to_string(),
            chain: "ethereum".to_string(),
            network: "sepolia".to_string(),
            connector: "panoptic".to_string(),
            timeout_secs: 30,
            requests_per_minute: 120,
            read_retry_attempts: 3,
            read_retry_delay_ms: 500,
        }
    }
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            token0: "t0".to_string(),
            token1: "t1".to_string(),
            fee: 500,
            wallet_address: String::new(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 12,
            default_timescale: Timescale::OneHour,
            position_size: format!("1{}", "0".repeat(25)),
            effective_liquidity_limit: "0".to_string(),
            use_burn_and_mint: true,
            confirmation_poll_ms: 2_000,
            max_confirmation_polls: 150,
            spot_log_path: "logs/spot_data.dat".to_string(),
        }
    }
}

fn parse_amount(field: &str, value: &str) -> Result<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|e| KeeperError::config(format!("{field} '{value}' is not a decimal integer: {e}")))
}

impl StrategyConfig {
    /// # Errors
    ///
    /// Returns a configuration error if the size is not a decimal integer.
    pub fn position_size(&self) -> Result<U256> {
        parse_amount("strategy.position_size", &self.position_size)
    }

    /// # Errors
    ///
    /// Returns a configuration error if the limit is not a decimal integer.
    pub fn effective_liquidity_limit(&self) -> Result<U256> {
        parse_amount(
            "strategy.effective_liquidity_limit",
            &self.effective_liquidity_limit,
        )
    }
}

impl AppConfig {
    /// Checks the settings a session cannot start without.
    ///
    /// # Errors
    ///
    /// Returns [`KeeperError::Config`] naming the first missing or invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.pair.wallet_address.trim().is_empty() {
            return Err(KeeperError::config("pair.wallet_address is not set"));
        }
        if self.gateway.base_url.trim().is_empty() {
            return Err(KeeperError::config("gateway.base_url is not set"));
        }
        if self.pair.token0 == self.pair.token1 {
            return Err(KeeperError::config("pair.token0 and pair.token1 must differ"));
        }
        if ![500, 3000, 10_000].contains(&self.pair.fee) {
            return Err(KeeperError::config(format!(
                "pair.fee {} is not a Uniswap fee tier (500, 3000, 10000)",
                self.pair.fee
            )));
        }
        if self.strategy.poll_interval_secs == 0 {
            return Err(KeeperError::config("strategy.poll_interval_secs must be positive"));
        }
        if self.strategy.max_confirmation_polls == 0 {
            return Err(KeeperError::config(
                "strategy.max_confirmation_polls must be positive",
            ));
        }
        if self.gateway.read_retry_attempts == 0 {
            return Err(KeeperError::config("gateway.read_retry_attempts must be positive"));
        }
        if !self.strategy.spot_log_path.ends_with(".dat") {
            return Err(KeeperError::config("strategy.spot_log_path must end with .dat"));
        }
        self.strategy.position_size()?;
        self.strategy.effective_liquidity_limit()?;
        Ok(())
    }
}
