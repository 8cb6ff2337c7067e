//! `spot-summary` command: reads a keeper spot log and prints its bounds.

use anyhow::Result;
use clap::Args;
use range_keeper_data::{SpotLog, SpotSummary, TIMESTAMP_FORMAT};

/// Arguments for the spot-summary command.
#[derive(Args, Debug, Clone)]
pub struct SpotSummaryArgs {
    /// Path to a `.dat` spot log
    pub path: String,
}

fn format_summary(summary: &SpotSummary) -> String {
    format!(
        "pool:    {}\nrecords: {}\nfrom:    {}\nto:      {}\nprice:   {:.8} .. {:.8}\ntick:    {:.2} .. {:.2}",
        summary.pool_id,
        summary.records,
        summary.first.format(TIMESTAMP_FORMAT),
        summary.last.format(TIMESTAMP_FORMAT),
        summary.min_price,
        summary.max_price,
        summary.min_tick,
        summary.max_tick,
    )
}

/// Runs the spot-summary command.
///
/// # Errors
/// Returns an error if the file is missing, malformed, empty, or mixes pools.
pub fn run_spot_summary(args: &SpotSummaryArgs) -> Result<()> {
    let summary = SpotLog::new(&args.path)?.summary()?;
    println!("{}", format_summary(&summary));
    Ok(())
}
