//! CLI commands for the range keeper.

pub mod convert;
pub mod run;
pub mod spot_summary;

pub use convert::{run_convert, ConvertCommand};
pub use run::{run_keeper, RunArgs};
pub use spot_summary::{run_spot_summary, SpotSummaryArgs};
