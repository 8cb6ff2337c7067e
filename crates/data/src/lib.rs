//! Persistence for the range keeper.
//!
//! The keeper appends one spot record per cycle to a `.dat` file. Readers
//! (plotting, the `spot-summary` command) load it back and reject files that
//! mix pools.

pub mod spot_log;

pub use spot_log::{SpotLog, SpotRecord, SpotSummary, TIMESTAMP_FORMAT};
