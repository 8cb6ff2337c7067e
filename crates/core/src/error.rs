//! Error taxonomy for the range keeper.
//!
//! [`DomainError`] covers rejected inputs to the pure tick math. [`KeeperError`]
//! is what every collaborator call and every cycle step returns; its variants
//! decide how far a failure propagates (the action, the cycle, or the session).

use ethers::types::U256;
use thiserror::Error;

/// Inputs rejected by the coordinate math before any side effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Price was zero, negative, or not finite.
    #[error("invalid price: {0} (must be positive and finite)")]
    InvalidPrice(f64),

    /// Timescale name not present in the width table.
    #[error("unsupported timescale '{0}', supported timescales are 1H, 1D, 1W, 1M, 1Y")]
    UnsupportedTimescale(String),

    /// No timescale reproduces this width for the tick spacing.
    #[error("unsupported width {width} for tick spacing {tick_spacing}")]
    UnsupportedWidth {
        /// Width in tick-spacing units.
        width: i32,
        /// Pool tick spacing.
        tick_spacing: i32,
    },

    /// Tick spacing must be a positive integer.
    #[error("invalid tick spacing {0}")]
    InvalidTickSpacing(i32),

    /// Width cannot be centred inside the usable tick range.
    #[error("width {width} does not fit the usable tick range of {span} ticks")]
    WidthExceedsRange {
        /// Requested window width in raw ticks.
        width: i32,
        /// `max_usable_tick - min_usable_tick` for the spacing.
        span: i32,
    },

    /// Tick ladder entries must be strictly ascending.
    #[error("tick ladder is not strictly ascending at index {index}")]
    UnorderedLadder {
        /// First offending index.
        index: usize,
    },
}

/// Errors surfaced by the keeper and its collaborators.
#[derive(Debug, Error)]
pub enum KeeperError {
    /// Rejected input; the cycle aborts with no side effect attempted.
    #[error("input domain error: {0}")]
    Domain(#[from] DomainError),

    /// Missing wallet, connection or pool settings. Fatal to the session.
    #[error("configuration error: {0}")]
    Config(String),

    /// Gateway call failed or returned a malformed response.
    #[error("venue call {endpoint} failed: {message}")]
    Venue {
        /// Endpoint path, e.g. `options/getSpotPrice`.
        endpoint: String,
        /// Failure description.
        message: String,
        /// Whether a read-only caller may retry.
        retryable: bool,
    },

    /// Venue-reported collateral does not cover the planned mint.
    #[error("insufficient collateral for token{token}: balance {balance}, required {required}")]
    CollateralInsufficient {
        /// 0 or 1.
        token: u8,
        /// Collateral balance reported by the venue.
        balance: U256,
        /// Collateral required for the resulting position list.
        required: U256,
    },

    /// Transaction did not reach a terminal status within the poll cap.
    #[error("transaction {tx_hash} unconfirmed after {attempts} polls")]
    ConfirmationTimeout {
        /// Transaction hash being polled.
        tx_hash: String,
        /// Polls performed.
        attempts: u32,
    },
}

impl KeeperError {
    /// Creates a non-retryable venue error.
    pub fn venue(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Venue {
            endpoint: endpoint.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a venue error that read-only callers may retry.
    pub fn transient_venue(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Venue {
            endpoint: endpoint.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if a read-only request may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Venue { retryable: true, .. })
    }

    /// Returns true if the session must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for keeper operations.
pub type Result<T> = std::result::Result<T, KeeperError>;
