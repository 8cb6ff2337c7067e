//! Deterministic range keeping for Panoptic straddles.
//!
//! Runs as a long-lived service that, once per poll interval:
//! - Reads the spot price and converts it to a tick
//! - Brackets the tick in the pool's initialized-tick ladder
//! - Classifies every held position's legs as in range or not
//! - Opens a straddle when none is held, replaces stale ones otherwise
//! - Polls submitted transactions to a terminal status
//!
//! Only one cycle runs at a time; overlapping triggers are dropped.

pub mod evaluator;
pub mod executor;
pub mod gate;
pub mod planner;
pub mod service;
pub mod types;

pub use evaluator::{classify_leg, evaluate, LegVerdict, PositionEvaluation, RangeEvaluation};
pub use executor::{await_confirmation, PlanExecutor};
pub use gate::{CycleGate, CyclePermit, CyclePhase};
pub use service::{resolve_session, run, Keeper};
pub use types::{
    ActionOutcome, ActionReport, CycleContext, CycleOutcome, CycleReport, ExecutionSettings,
    PlannedAction, RebalancePlan,
};
