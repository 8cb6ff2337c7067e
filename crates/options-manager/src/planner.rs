//! Turns a range evaluation into an ordered rebalance plan.

use std::collections::HashSet;

use range_keeper_core::TokenId;
use tracing::{info, warn};

use crate::evaluator::RangeEvaluation;
use crate::types::{PlannedAction, RebalancePlan};

/// True when the cycle must encode a replacement straddle: nothing is held,
/// or something held is out of range.
#[must_use]
pub fn needs_action(held: &[TokenId], evaluation: &RangeEvaluation) -> bool {
    held.is_empty() || evaluation.positions.iter().any(|p| p.is_out_of_range())
}

/// Builds the plan for one cycle.
///
/// With nothing held, the plan opens `replacement`. Otherwise every stale
/// position is replaced by `replacement`, unless that id is already held by
/// an in-range position or was minted earlier in this plan, in which case the
/// stale position is only retired. In-range positions are never touched.
#[must_use]
pub fn plan(held: &[TokenId], evaluation: &RangeEvaluation, replacement: TokenId) -> RebalancePlan {
    if held.is_empty() {
        info!(token_id = %replacement, "No open positions, planning new straddle");
        return RebalancePlan {
            actions: vec![PlannedAction::Open {
                token_id: replacement,
            }],
        };
    }

    let stale: Vec<TokenId> = evaluation.stale_ids();
    let stale_set: HashSet<TokenId> = stale.iter().copied().collect();
    let mut covered = held
        .iter()
        .any(|id| *id == replacement && !stale_set.contains(id));

    let mut actions = Vec::with_capacity(stale.len());
    for stale_id in stale {
        if stale_id == replacement {
            warn!(token_id = %stale_id, "Replacement equals the stale position, leaving it");
            continue;
        }
        if covered {
            actions.push(PlannedAction::Retire {
                stale: stale_id,
                covered_by: replacement,
            });
        } else {
            actions.push(PlannedAction::Replace {
                stale: stale_id,
                replacement,
            });
            covered = true;
        }
    }

    info!(actions = actions.len(), "Rebalance planned");
    RebalancePlan { actions }
}
