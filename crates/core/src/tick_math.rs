//! Tick and price coordinate conversions for Uniswap V3-style pools.
//!
//! A tick `t` maps to the absolute price `1.0001^t`. The adjusted price
//! rescales that by the token decimals so it reads in human units:
//! `adjusted = absolute * 10^(token0_decimals - token1_decimals)`.
//!
//! Conversions use `f64`. Precision degrades near the tick bounds but
//! round trips stay within `1e-6` ticks and `1e-9` relative price.

use crate::error::DomainError;

/// Lowest tick a Uniswap V3 pool accepts.
pub const MIN_TICK: i32 = -887_272;

/// Highest tick a Uniswap V3 pool accepts.
pub const MAX_TICK: i32 = 887_272;

/// Base of the tick-price exponential.
const TICK_BASE: f64 = 1.0001;

fn decimals_factor(t0_decimals: u8, t1_decimals: u8) -> f64 {
    10f64.powi(i32::from(t0_decimals) - i32::from(t1_decimals))
}

/// Computes `1.0001^tick` as `10^(tick * log10(1.0001))`.
///
/// Accepts fractional ticks so that real-valued ticks from
/// [`absolute_price_to_tick`] convert back exactly.
#[must_use]
pub fn tick_to_absolute_price(tick: f64) -> f64 {
    10f64.powf(tick * TICK_BASE.log10())
}

/// Rescales an absolute price into token units.
#[must_use]
pub fn absolute_price_to_adjusted_price(absolute_price: f64, t0_decimals: u8, t1_decimals: u8) -> f64 {
    absolute_price * decimals_factor(t0_decimals, t1_decimals)
}

/// Inverse of [`absolute_price_to_adjusted_price`].
#[must_use]
pub fn adjusted_price_to_absolute_price(adjusted_price: f64, t0_decimals: u8, t1_decimals: u8) -> f64 {
    adjusted_price / decimals_factor(t0_decimals, t1_decimals)
}

/// Adjusted price at a tick.
#[must_use]
pub fn tick_to_adjusted_price(tick: f64, t0_decimals: u8, t1_decimals: u8) -> f64 {
    absolute_price_to_adjusted_price(tick_to_absolute_price(tick), t0_decimals, t1_decimals)
}

/// Real-valued (unsnapped) tick for an absolute price.
///
/// # Errors
///
/// Returns [`DomainError::InvalidPrice`] if `price` is not positive and finite.
pub fn absolute_price_to_tick(price: f64) -> Result<f64, DomainError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DomainError::InvalidPrice(price));
    }
    Ok(price.log10() / TICK_BASE.log10())
}

/// Real-valued tick for an adjusted price; inverts [`tick_to_adjusted_price`].
///
/// # Errors
///
/// Returns [`DomainError::InvalidPrice`] if `adjusted_price` is not positive and finite.
pub fn adjusted_price_to_tick(adjusted_price: f64, t0_decimals: u8, t1_decimals: u8) -> Result<f64, DomainError> {
    if !adjusted_price.is_finite() || adjusted_price <= 0.0 {
        return Err(DomainError::InvalidPrice(adjusted_price));
    }
    absolute_price_to_tick(adjusted_price_to_absolute_price(adjusted_price, t0_decimals, t1_decimals))
}

/// Smallest multiple of `tick_spacing` that is `>= MIN_TICK`.
#[must_use]
pub const fn min_usable_tick(tick_spacing: i32) -> i32 {
    -((-MIN_TICK).div_euclid(tick_spacing)) * tick_spacing
}

/// Largest multiple of `tick_spacing` that is `<= MAX_TICK`.
#[must_use]
pub const fn max_usable_tick(tick_spacing: i32) -> i32 {
    MAX_TICK.div_euclid(tick_spacing) * tick_spacing
}

/// Snaps `current_tick` to a strike whose centred window of `width` raw ticks
/// stays within the usable tick range.
///
/// The candidate is floored to the spacing, shifted up if the window's lower
/// edge falls below the usable minimum, then down if the upper edge exceeds
/// the usable maximum. If either edge is then off the spacing grid, the
/// candidate is nudged half a spacing towards `current_tick`.
///
/// With an odd `tick_spacing` the half-spacing nudge cannot land on the grid,
/// so alignment is best effort in that case.
///
/// # Errors
///
/// - [`DomainError::InvalidTickSpacing`] if `tick_spacing <= 0`.
/// - [`DomainError::WidthExceedsRange`] if `width` is negative or wider than
///   the usable range, where the boundary shifts cannot both hold.
pub fn get_valid_tick(current_tick: i32, tick_spacing: i32, width: i32) -> Result<i32, DomainError> {
    if tick_spacing <= 0 {
        return Err(DomainError::InvalidTickSpacing(tick_spacing));
    }
    let min_tick = i64::from(min_usable_tick(tick_spacing));
    let max_tick = i64::from(max_usable_tick(tick_spacing));
    let span = max_tick - min_tick;
    if width < 0 || i64::from(width) > span {
        return Err(DomainError::WidthExceedsRange {
            width,
            span: span as i32,
        });
    }

    let spacing = i64::from(tick_spacing);
    let current = i64::from(current_tick);
    let half = i64::from(width / 2);

    let mut candidate = current.div_euclid(spacing) * spacing;
    let mut lower = candidate - half;
    let mut upper = candidate + half;

    if lower < min_tick {
        candidate += min_tick - lower;
        lower = candidate - half;
        upper = candidate + half;
    }
    if upper > max_tick {
        candidate -= upper - max_tick;
        lower = candidate - half;
        upper = candidate + half;
    }

    if lower.rem_euclid(spacing) != 0 || upper.rem_euclid(spacing) != 0 {
        let nudge = spacing / 2;
        if candidate < current {
            candidate += nudge;
        } else {
            candidate -= nudge;
        }
    }

    // Bounded by the usable range (plus at most half a spacing), so it fits.
    Ok(candidate as i32)
}
