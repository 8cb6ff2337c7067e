//! Types for range keeping.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use range_keeper_core::{Result, StrategyConfig, TickBracket, TokenId, TxStatus, U256};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one cycle's market view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleContext {
    pub timestamp: DateTime<Utc>,
    pub spot_price: f64,
    /// Real-valued tick of the spot price.
    pub spot_tick: f64,
    /// `floor(spot_tick)`.
    pub at_tick: i32,
    pub bracket: TickBracket,
    /// Ladder tick nearest the spot; collateral is checked there.
    pub collateral_tick: i32,
}

/// One step of a rebalance plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannedAction {
    /// Mint a straddle where none is held.
    Open { token_id: TokenId },
    /// Mint `replacement` and burn `stale`.
    Replace { stale: TokenId, replacement: TokenId },
    /// Burn `stale` only; `covered_by` is already held or minted earlier in
    /// the plan.
    Retire { stale: TokenId, covered_by: TokenId },
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { token_id } => write!(f, "open {token_id}"),
            Self::Replace { stale, replacement } => write!(f, "replace {stale} with {replacement}"),
            Self::Retire { stale, covered_by } => {
                write!(f, "retire {stale} (covered by {covered_by})")
            }
        }
    }
}

/// Ordered actions for one cycle. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub actions: Vec<PlannedAction>,
}

impl RebalancePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// Final state of one dispatched action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Every transaction of the action reached `Success`.
    Confirmed { tx_hashes: Vec<String> },
    /// A transaction was mined and reverted.
    Failed { tx_hash: String },
    /// Polling stopped at the attempt cap; the outcome is unknown.
    Unconfirmed { tx_hash: String },
    /// Collateral gate refused the mint; nothing was sent.
    CollateralShortfall {
        token: u8,
        balance: U256,
        required: U256,
    },
    /// A Gateway call failed before or while dispatching.
    Errored { message: String },
}

impl ActionOutcome {
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub(crate) fn from_status(tx_hashes: Vec<String>, status: TxStatus) -> Self {
        match status {
            TxStatus::Success => Self::Confirmed { tx_hashes },
            TxStatus::Failed => Self::Failed {
                tx_hash: tx_hashes.last().cloned().unwrap_or_default(),
            },
            TxStatus::Pending => Self::Unconfirmed {
                tx_hash: tx_hashes.last().cloned().unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub action: PlannedAction,
    pub outcome: ActionOutcome,
}

/// What a completed cycle observed and did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub context: CycleContext,
    pub open_positions: usize,
    pub out_of_range: Vec<TokenId>,
    pub plan: RebalancePlan,
    pub actions: Vec<ActionReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle held the permit; no collaborator was called.
    Skipped,
}

/// Sizing and dispatch knobs resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    pub position_size: U256,
    pub effective_liquidity_limit: U256,
    pub use_burn_and_mint: bool,
    pub confirmation_interval: Duration,
    pub max_confirmation_polls: u32,
}

impl ExecutionSettings {
    /// # Errors
    ///
    /// Returns a configuration error if an amount is not a decimal integer.
    pub fn from_strategy(strategy: &StrategyConfig) -> Result<Self> {
        Ok(Self {
            position_size: strategy.position_size()?,
            effective_liquidity_limit: strategy.effective_liquidity_limit()?,
            use_burn_and_mint: strategy.use_burn_and_mint,
            confirmation_interval: Duration::from_millis(strategy.confirmation_poll_ms),
            max_confirmation_polls: strategy.max_confirmation_polls.max(1),
        })
    }
}
