//! Classifies held positions against the ladder bracket around the spot tick.

use range_keeper_core::{Position, PositionLeg, TickBracket, TickLadder, TokenId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegVerdict {
    InRange,
    OutOfRange,
    /// A bracket edge is missing, so overlap cannot be decided.
    Indeterminate,
}

/// Inclusive overlap of the leg's tick range with `[lower, upper]`.
#[must_use]
pub fn classify_leg(leg: &PositionLeg, tick_spacing: i32, bracket: &TickBracket) -> LegVerdict {
    let Some((lower, upper)) = bracket.bounds() else {
        return LegVerdict::Indeterminate;
    };
    let (strike_low, strike_high) = leg.strike_bounds(tick_spacing);
    if strike_low <= f64::from(upper) && strike_high >= f64::from(lower) {
        LegVerdict::InRange
    } else {
        LegVerdict::OutOfRange
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEvaluation {
    pub token_id: TokenId,
    pub verdicts: Vec<LegVerdict>,
}

impl PositionEvaluation {
    /// At least one leg is definitively out of range.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        self.verdicts.contains(&LegVerdict::OutOfRange)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEvaluation {
    pub bracket: TickBracket,
    pub positions: Vec<PositionEvaluation>,
}

impl RangeEvaluation {
    /// Indices of out-of-range positions, in input order.
    #[must_use]
    pub fn out_of_range(&self) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_out_of_range())
            .map(|(i, _)| i)
            .collect()
    }

    #[must_use]
    pub fn stale_ids(&self) -> Vec<TokenId> {
        self.positions
            .iter()
            .filter(|p| p.is_out_of_range())
            .map(|p| p.token_id)
            .collect()
    }
}

/// Brackets `target_tick` in the ladder and classifies every leg.
#[must_use]
pub fn evaluate(
    target_tick: f64,
    ladder: &TickLadder,
    tick_spacing: i32,
    positions: &[Position],
) -> RangeEvaluation {
    let bracket = ladder.bracket(target_tick);
    debug!(target_tick, lower = ?bracket.lower, upper = ?bracket.upper, "Bracketed spot tick");

    let positions = positions
        .iter()
        .map(|position| {
            let verdicts = position
                .legs
                .iter()
                .enumerate()
                .map(|(leg_index, leg)| {
                    let verdict = classify_leg(leg, tick_spacing, &bracket);
                    let (strike_low, strike_high) = leg.strike_bounds(tick_spacing);
                    debug!(
                        token_id = %position.token_id,
                        leg = leg_index + 1,
                        asset = leg.asset,
                        is_long = leg.is_long,
                        token_type = leg.token_type,
                        strike = leg.strike,
                        width = leg.width,
                        strike_low,
                        strike_high,
                        ?verdict,
                        "Leg evaluated"
                    );
                    verdict
                })
                .collect();
            PositionEvaluation {
                token_id: position.token_id,
                verdicts,
            }
        })
        .collect();

    RangeEvaluation { bracket, positions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(strike: i32, width: i32) -> PositionLeg {
        PositionLeg {
            asset: 0,
            is_long: false,
            token_type: 0,
            option_ratio: 1,
            risk_partner: 0,
            strike,
            width,
        }
    }

    fn position(id: u64, legs: Vec<PositionLeg>) -> Position {
        Position {
            token_id: TokenId::from(id),
            legs,
        }
    }

    fn ladder() -> TickLadder {
        TickLadder::new(vec![100, 200, 300]).unwrap()
    }

    #[test]
    fn leg_left_of_bracket_is_out_of_range() {
        // [90, 210] reaches the [200, 300] bracket; [70, 130] does not.
        let bracket = ladder().bracket(250.0);
        assert_eq!(bracket.bounds(), Some((200, 300)));
        assert_eq!(classify_leg(&leg(150, 2), 60, &bracket), LegVerdict::InRange);
        assert_eq!(classify_leg(&leg(100, 1), 60, &bracket), LegVerdict::OutOfRange);
    }

    #[test]
    fn touching_edge_counts_as_in_range() {
        let bracket = ladder().bracket(250.0);
        // strike_low == upper
        assert_eq!(classify_leg(&leg(330, 1), 60, &bracket), LegVerdict::InRange);
        // strike_high == lower
        assert_eq!(classify_leg(&leg(170, 1), 60, &bracket), LegVerdict::InRange);
        // one tick past either edge
        assert_eq!(classify_leg(&leg(331, 1), 60, &bracket), LegVerdict::OutOfRange);
        assert_eq!(classify_leg(&leg(169, 1), 60, &bracket), LegVerdict::OutOfRange);
    }

    #[test]
    fn missing_bracket_edge_is_indeterminate() {
        let below = ladder().bracket(50.0);
        let above = ladder().bracket(350.0);
        assert_eq!(classify_leg(&leg(0, 1), 60, &below), LegVerdict::Indeterminate);
        assert_eq!(classify_leg(&leg(10_000, 1), 60, &above), LegVerdict::Indeterminate);
    }

    #[test]
    fn one_bad_leg_marks_position() {
        let positions = vec![
            position(1, vec![leg(250, 2)]),
            position(2, vec![leg(250, 2), leg(-5_000, 2)]),
            position(3, vec![leg(220, 1)]),
        ];
        let evaluation = evaluate(250.0, &ladder(), 60, &positions);
        assert_eq!(evaluation.out_of_range(), vec![1]);
        assert_eq!(evaluation.stale_ids(), vec![TokenId::from(2)]);
        assert_eq!(
            evaluation.positions[1].verdicts,
            vec![LegVerdict::InRange, LegVerdict::OutOfRange]
        );
    }

    #[test]
    fn indeterminate_positions_are_never_stale() {
        let positions = vec![position(1, vec![leg(-50_000, 1)])];
        let evaluation = evaluate(1_000.0, &ladder(), 60, &positions);
        assert_eq!(evaluation.positions[0].verdicts, vec![LegVerdict::Indeterminate]);
        assert!(evaluation.out_of_range().is_empty());
    }

    #[test]
    fn narrow_leg_far_from_target_is_stale() {
        // Bracket [200, 300]. Spacing 60 gives [90, 210], which overlaps
        // since 210 >= 200. Spacing 10 gives [140, 160], which does not.
        let positions = vec![position(7, vec![leg(150, 2)])];
        assert!(evaluate(250.0, &ladder(), 60, &positions)
            .out_of_range()
            .is_empty());
        assert_eq!(evaluate(250.0, &ladder(), 10, &positions).out_of_range(), vec![0]);
    }
}
