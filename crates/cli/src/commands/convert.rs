//! `convert` command: offline tick, price and width conversions.

use anyhow::Result;
use clap::Subcommand;
use range_keeper_core::{
    adjusted_price_to_tick, get_valid_tick, tick_to_absolute_price, tick_to_adjusted_price,
    width_to_timescale, Timescale,
};

#[derive(Subcommand, Debug, Clone)]
pub enum ConvertCommand {
    /// Price of a tick, absolute and decimal-adjusted
    TickToPrice {
        #[arg(long, allow_negative_numbers = true)]
        tick: f64,
        #[arg(long, default_value_t = 18)]
        decimals0: u8,
        #[arg(long, default_value_t = 18)]
        decimals1: u8,
    },
    /// Real-valued tick of a decimal-adjusted price
    PriceToTick {
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 18)]
        decimals0: u8,
        #[arg(long, default_value_t = 18)]
        decimals1: u8,
    },
    /// Width in tick-spacing units for a timescale, or the reverse with --width
    Width {
        /// 1H, 1D, 1W, 1M or 1Y
        #[arg(long, conflicts_with = "width", required_unless_present = "width")]
        timescale: Option<Timescale>,
        #[arg(long)]
        width: Option<i32>,
        #[arg(long)]
        tick_spacing: i32,
    },
    /// Spacing-aligned strike nearest a tick for a width in spacing units
    ValidTick {
        #[arg(long, allow_negative_numbers = true)]
        tick: i32,
        #[arg(long)]
        tick_spacing: i32,
        #[arg(long)]
        width: i32,
    },
}

fn convert(command: &ConvertCommand) -> Result<String> {
    let line = match *command {
        ConvertCommand::TickToPrice {
            tick,
            decimals0,
            decimals1,
        } => format!(
            "tick {tick}: absolute price {:.10e}, adjusted price {:.10}",
            tick_to_absolute_price(tick),
            tick_to_adjusted_price(tick, decimals0, decimals1)
        ),
        ConvertCommand::PriceToTick {
            price,
            decimals0,
            decimals1,
        } => {
            let tick = adjusted_price_to_tick(price, decimals0, decimals1)?;
            format!("price {price}: tick {tick:.4} (floor {})", tick.floor())
        }
        ConvertCommand::Width {
            timescale: Some(timescale),
            tick_spacing,
            ..
        } => format!(
            "{timescale} at spacing {tick_spacing}: width {}",
            timescale.width(tick_spacing)?
        ),
        ConvertCommand::Width {
            width: Some(width),
            tick_spacing,
            ..
        } => format!(
            "width {width} at spacing {tick_spacing}: {}",
            width_to_timescale(width, tick_spacing)?
        ),
        ConvertCommand::Width { .. } => anyhow::bail!("either --timescale or --width is required"),
        ConvertCommand::ValidTick {
            tick,
            tick_spacing,
            width,
        } => {
            let raw_width = width
                .checked_mul(tick_spacing)
                .ok_or_else(|| anyhow::anyhow!("width {width} x spacing {tick_spacing} overflows"))?;
            format!(
                "tick {tick}, spacing {tick_spacing}, width {width}: strike {}",
                get_valid_tick(tick, tick_spacing, raw_width)?
            )
        }
    };
    Ok(line)
}

/// Runs a conversion and prints the result.
///
/// # Errors
/// Returns an error for non-positive prices, invalid spacings, or widths off
/// the timescale table.
pub fn run_convert(command: ConvertCommand) -> Result<()> {
    println!("{}", convert(&command)?);
    Ok(())
}
