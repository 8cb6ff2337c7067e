//! Named timescales and their tick widths.
//!
//! Each timescale has a fixed raw span in ticks. For a pool the width in
//! tick-spacing units is `ceil(raw_span / tick_spacing)`; the reverse lookup
//! applies the same rounding, so only widths produced that way map back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Option duration bucket used to size position widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timescale {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "1Y")]
    OneYear,
}

impl Timescale {
    /// All timescales, ordered by raw span.
    pub const ALL: [Self; 5] = [
        Self::OneHour,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::OneYear,
    ];

    /// Canonical span in raw ticks.
    #[must_use]
    pub const fn raw_span(self) -> i32 {
        match self {
            Self::OneHour => 120,
            Self::OneDay => 720,
            Self::OneWeek => 2400,
            Self::OneMonth => 4800,
            Self::OneYear => 16_000,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1H",
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::OneYear => "1Y",
        }
    }

    /// Width in tick-spacing units for a pool.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTickSpacing`] if `tick_spacing <= 0`.
    pub fn width(self, tick_spacing: i32) -> Result<i32, DomainError> {
        if tick_spacing <= 0 {
            return Err(DomainError::InvalidTickSpacing(tick_spacing));
        }
        let span = self.raw_span();
        Ok(span / tick_spacing + i32::from(span % tick_spacing != 0))
    }

    /// First timescale (by span) whose width for `tick_spacing` equals `width`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnsupportedWidth`] if no table entry matches.
    pub fn from_width(width: i32, tick_spacing: i32) -> Result<Self, DomainError> {
        for timescale in Self::ALL {
            if timescale.width(tick_spacing)? == width {
                return Ok(timescale);
            }
        }
        Err(DomainError::UnsupportedWidth { width, tick_spacing })
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timescale {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::UnsupportedTimescale(s.to_string()))
    }
}

/// Width in tick-spacing units for a timescale name.
///
/// # Errors
///
/// Returns [`DomainError::UnsupportedTimescale`] for unknown names.
pub fn timescale_to_width(timescale: &str, tick_spacing: i32) -> Result<i32, DomainError> {
    timescale.parse::<Timescale>()?.width(tick_spacing)
}

/// Timescale name for a width.
///
/// # Errors
///
/// Returns [`DomainError::UnsupportedWidth`] if the width is off the table.
pub fn width_to_timescale(width: i32, tick_spacing: i32) -> Result<Timescale, DomainError> {
    Timescale::from_width(width, tick_spacing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(timescale_to_width("1H", 10).unwrap(), 12);
        assert_eq!(timescale_to_width("1D", 7).unwrap(), 103);
        assert_eq!(timescale_to_width("1W", 60).unwrap(), 40);
        assert_eq!(timescale_to_width("1Y", 1).unwrap(), 16_000);
        assert_eq!(timescale_to_width("1M", 200).unwrap(), 24);
    }

    #[test]
    fn test_unknown_timescale_rejected() {
        assert_eq!(
            timescale_to_width("2H", 10),
            Err(DomainError::UnsupportedTimescale("2H".to_string()))
        );
        assert!(timescale_to_width("1h", 10).is_err());
        assert!(timescale_to_width("", 10).is_err());
    }

    #[test]
    fn test_invalid_spacing_rejected() {
        assert_eq!(
            timescale_to_width("1H", 0),
            Err(DomainError::InvalidTickSpacing(0))
        );
        assert!(width_to_timescale(12, -10).is_err());
    }

    #[test]
    fn test_round_trip_for_named_spacings() {
        for spacing in [1, 7, 10, 60] {
            for timescale in Timescale::ALL {
                let width = timescale_to_width(timescale.as_str(), spacing).unwrap();
                assert_eq!(width_to_timescale(width, spacing).unwrap(), timescale);
            }
        }
    }

    #[test]
    fn test_round_trip_exhaustive_spacings() {
        for spacing in 1..=200 {
            for timescale in Timescale::ALL {
                let width = timescale.width(spacing).unwrap();
                assert_eq!(
                    Timescale::from_width(width, spacing).unwrap(),
                    timescale,
                    "spacing {spacing}"
                );
            }
        }
    }

    #[test]
    fn test_huge_spacing_is_one_unit() {
        for timescale in Timescale::ALL {
            assert_eq!(timescale.width(i32::MAX).unwrap(), 1);
            assert_eq!(timescale.width(i32::MAX - 1).unwrap(), 1);
        }
        assert_eq!(Timescale::from_width(1, i32::MAX).unwrap(), Timescale::OneHour);
    }

    #[test]
    fn test_off_table_width_rejected() {
        assert_eq!(
            width_to_timescale(13, 10),
            Err(DomainError::UnsupportedWidth {
                width: 13,
                tick_spacing: 10
            })
        );
        assert!(width_to_timescale(0, 60).is_err());
    }

    #[test]
    fn test_serde_uses_short_names() {
        let json = serde_json::to_string(&Timescale::OneDay).unwrap();
        assert_eq!(json, "\"1D\"");
        let parsed: Timescale = serde_json::from_str("\"1W\"").unwrap();
        assert_eq!(parsed, Timescale::OneWeek);
        assert_eq!(Timescale::OneMonth.to_string(), "1M");
    }
}
