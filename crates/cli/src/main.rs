use clap::{Parser, Subcommand};

mod commands;

use commands::{ConvertCommand, RunArgs, SpotSummaryArgs};

#[derive(Parser, Debug)]
#[command(name = "range-keeper")]
#[command(about = "Keeps Panoptic straddles in range around the Uniswap V3 spot tick", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the keeper service until Ctrl-C
    Run(RunArgs),
    /// Convert between ticks, prices and widths
    #[command(subcommand)]
    Convert(ConvertCommand),
    /// Summarize a spot log written by the keeper
    SpotSummary(SpotSummaryArgs),
}

fn init_tracing(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Run(args) => args.log_file.as_deref(),
        _ => None,
    };
    init_tracing(log_file)?;

    match cli.command {
        Commands::Run(args) => commands::run_keeper(args).await?,
        Commands::Convert(command) => commands::run_convert(command)?,
        Commands::SpotSummary(args) => commands::run_spot_summary(&args)?,
    }

    Ok(())
}
