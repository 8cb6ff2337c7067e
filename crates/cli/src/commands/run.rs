//! `run` command: the long-lived keeper service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use range_keeper_core::{AppConfig, ConfigLoader, DEFAULT_CONFIG_PATH};
use range_keeper_gateway::{GatewayClient, GatewayClientConfig};
use range_keeper_options_manager::{service, Keeper};

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Profile overlay, loaded from `Keeper.{profile}.toml` beside the config
    #[arg(short, long, env = "KEEPER_PROFILE")]
    pub profile: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<String>,
}

fn load_config(args: &RunArgs) -> Result<AppConfig> {
    let config = match &args.profile {
        Some(profile) => ConfigLoader::load_with_profile(&args.config, profile),
        None => ConfigLoader::load(&args.config),
    };
    let config = config.with_context(|| format!("Failed to load config from {}", args.config))?;
    config.validate()?;
    Ok(config)
}

/// Runs the keeper until Ctrl-C or a fatal error.
///
/// # Errors
/// Returns an error if the configuration is invalid, the session cannot be
/// resolved, or the service stops on a fatal error.
pub async fn run_keeper(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    tracing::info!(
        config = %args.config,
        profile = ?args.profile,
        gateway = %config.gateway.base_url,
        token0 = %config.pair.token0,
        token1 = %config.pair.token1,
        "Starting range keeper"
    );

    let client = GatewayClient::new(GatewayClientConfig::from_app_config(&config)?)?;
    let keeper = Keeper::initialize(Arc::new(client), config)
        .await
        .context("Failed to initialize keeper session")?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = Arc::clone(&stop);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, stopping after the next tick");
                stop_on_signal.store(true, Ordering::SeqCst);
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    service::run(Arc::new(keeper), stop).await?;
    tracing::info!("Range keeper stopped");
    Ok(())
}
