//! Keeper service: session setup, the guarded cycle, and the polling loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use range_keeper_core::{
    adjusted_price_to_tick, get_valid_tick, AppConfig, KeeperError, PoolSession, Position, Result,
    StraddleSpec, TokenId, Venue,
};
use range_keeper_data::{SpotLog, SpotRecord};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::evaluator::evaluate;
use crate::executor::PlanExecutor;
use crate::gate::{CycleGate, CyclePermit, CyclePhase};
use crate::planner;
use crate::types::{CycleContext, CycleOutcome, CycleReport, ExecutionSettings};

/// Resolves the pool facts a session runs against.
///
/// # Errors
///
/// Returns a [`KeeperError::Config`] for a missing wallet, or the first
/// failing Gateway lookup.
pub async fn resolve_session<V: Venue + ?Sized>(venue: &V, config: &AppConfig) -> Result<PoolSession> {
    let pair = &config.pair;
    if pair.wallet_address.trim().is_empty() {
        return Err(KeeperError::config("pair.wallet_address is not set"));
    }

    info!(token0 = %pair.token0, token1 = %pair.token1, fee = pair.fee, "Resolving pool session");
    let token0 = venue.token_info(&pair.token0).await?;
    let token1 = venue.token_info(&pair.token1).await?;
    info!(t0_address = %token0.address, t1_address = %token1.address, "Token addresses resolved");

    let uniswap_pool = venue.uniswap_pool(&token0, &token1, pair.fee).await?;
    let panoptic_pool = venue.panoptic_pool(&uniswap_pool).await?;
    info!(%uniswap_pool, %panoptic_pool, "Pools resolved");

    let (tick_spacing, ladder) = venue.tick_spacing_and_ladder(&uniswap_pool).await?;
    info!(
        tick_spacing,
        initialized_ticks = ladder.len(),
        first = ?ladder.as_slice().first(),
        last = ?ladder.as_slice().last(),
        "Tick ladder loaded"
    );

    Ok(PoolSession {
        wallet_address: pair.wallet_address.clone(),
        token0,
        token1,
        fee: pair.fee,
        uniswap_pool,
        panoptic_pool,
        tick_spacing,
        ladder,
    })
}

/// Range keeper for one pool.
pub struct Keeper<V: Venue> {
    venue: Arc<V>,
    config: AppConfig,
    settings: ExecutionSettings,
    session: PoolSession,
    gate: CycleGate,
    spot_log: SpotLog,
}

impl<V: Venue> std::fmt::Debug for Keeper<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keeper")
            .field("panoptic_pool", &self.session.panoptic_pool)
            .field("phase", &self.gate.phase())
            .finish_non_exhaustive()
    }
}

impl<V: Venue> Keeper<V> {
    /// Validates configuration and resolves the session.
    ///
    /// # Errors
    ///
    /// Returns a configuration error or the first failing session lookup.
    pub async fn initialize(venue: Arc<V>, config: AppConfig) -> Result<Self> {
        config.validate()?;
        let settings = ExecutionSettings::from_strategy(&config.strategy)?;
        let spot_log = SpotLog::new(&config.strategy.spot_log_path)
            .map_err(|e| KeeperError::config(e.to_string()))?;
        let session = resolve_session(venue.as_ref(), &config).await?;

        Ok(Self {
            venue,
            config,
            settings,
            session,
            gate: CycleGate::new(),
            spot_log,
        })
    }

    #[must_use]
    pub fn session(&self) -> &PoolSession {
        &self.session
    }

    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        self.gate.phase()
    }

    #[must_use]
    pub fn gate(&self) -> &CycleGate {
        &self.gate
    }

    /// Runs one cycle, or returns [`CycleOutcome::Skipped`] when another
    /// cycle holds the permit.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the cycle. Per-action failures are
    /// reported in the [`CycleReport`] instead.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let Some(permit) = self.gate.try_acquire() else {
            debug!("Cycle already running, trigger dropped");
            return Ok(CycleOutcome::Skipped);
        };
        self.cycle(&permit).await.map(CycleOutcome::Completed)
    }

    async fn cycle(&self, permit: &CyclePermit) -> Result<CycleReport> {
        let session = &self.session;
        let venue = self.venue.as_ref();

        let spot_price = venue.spot_price(session).await?;
        let spot_tick =
            adjusted_price_to_tick(spot_price, session.token0.decimals, session.token1.decimals)?;
        let at_tick = spot_tick.floor() as i32;
        let context = CycleContext {
            timestamp: Utc::now(),
            spot_price,
            spot_tick,
            at_tick,
            bracket: session.ladder.bracket(spot_tick),
            collateral_tick: session.ladder.closest(spot_tick).unwrap_or(at_tick),
        };
        info!(
            price = spot_price,
            spot_tick,
            lower = ?context.bracket.lower,
            upper = ?context.bracket.upper,
            "Spot observed"
        );
        self.record_spot(&context);

        let held = venue.open_positions(&session.panoptic_pool).await?;
        info!(count = held.len(), "Open positions");
        let mut positions = Vec::with_capacity(held.len());
        for token_id in &held {
            let legs = venue.unwrap_position(token_id).await?;
            positions.push(Position {
                token_id: *token_id,
                legs,
            });
        }
        permit.advance(if held.is_empty() {
            CyclePhase::NoPositions
        } else {
            CyclePhase::HasPositions
        });

        let evaluation = evaluate(spot_tick, &session.ladder, session.tick_spacing, &positions);
        let out_of_range = evaluation.stale_ids();
        let mut report = CycleReport {
            context,
            open_positions: held.len(),
            out_of_range,
            plan: Default::default(),
            actions: Vec::new(),
        };

        if !planner::needs_action(&held, &evaluation) {
            info!("All positions in range");
            return Ok(report);
        }

        let replacement = self.encode_replacement(at_tick).await?;
        report.plan = planner::plan(&held, &evaluation, replacement);
        if report.plan.is_empty() {
            return Ok(report);
        }

        permit.advance(CyclePhase::ActionPlanned);
        report.actions = PlanExecutor::new(venue, session, &self.settings, context.collateral_tick)
            .execute(&report.plan, &held, permit)
            .await;
        Ok(report)
    }

    /// Encodes the centred short straddle for the configured timescale.
    async fn encode_replacement(&self, at_tick: i32) -> Result<TokenId> {
        let spacing = self.session.tick_spacing;
        let timescale = self.config.strategy.default_timescale;
        let width = timescale.width(spacing)?;
        let strike = get_valid_tick(at_tick, spacing, width * spacing)?;
        let spec = StraddleSpec::short(self.session.uniswap_pool.clone(), strike, width);

        let token_id = self.venue.create_straddle(&spec).await?;
        info!(%timescale, width, strike, %token_id, "Straddle encoded");
        Ok(token_id)
    }

    fn record_spot(&self, context: &CycleContext) {
        let record = SpotRecord {
            timestamp: context.timestamp.naive_utc(),
            pool_id: self.session.uniswap_pool.clone(),
            spot_price: context.spot_price,
            spot_tick: context.spot_tick,
        };
        if let Err(e) = self.spot_log.append(&record) {
            warn!(error = %e, path = %self.spot_log.path().display(), "Failed to log spot data");
        }
    }
}

/// Runs the keeper until `stop` is set or a cycle fails fatally.
///
/// Each tick spawns its cycle as a separate task, so a slow cycle makes later
/// ticks find the gate busy and drop.
///
/// # Errors
///
/// Returns the fatal error that ended the session.
pub async fn run<V: Venue + 'static>(keeper: Arc<Keeper<V>>, stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let poll_secs = keeper.config.strategy.poll_interval_secs;
    info!(
        poll_secs,
        pool = %keeper.session.panoptic_pool,
        timescale = %keeper.config.strategy.default_timescale,
        "Range keeper started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(poll_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let (fatal_tx, mut fatal_rx) = mpsc::channel::<KeeperError>(1);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            Some(err) = fatal_rx.recv() => {
                error!(error = %err, "Fatal error, stopping keeper");
                return Err(err.into());
            }
        }
        if stop.load(Ordering::SeqCst) {
            info!("Stop requested, keeper exiting");
            return Ok(());
        }

        let keeper = Arc::clone(&keeper);
        let fatal_tx = fatal_tx.clone();
        tokio::spawn(async move {
            match keeper.run_cycle().await {
                Ok(CycleOutcome::Completed(report)) => info!(
                    positions = report.open_positions,
                    out_of_range = report.out_of_range.len(),
                    actions = report.actions.len(),
                    "Cycle complete"
                ),
                Ok(CycleOutcome::Skipped) => {}
                Err(e) if e.is_fatal() => {
                    let _ = fatal_tx.send(e).await;
                }
                Err(e) => error!(error = %e, "Cycle aborted"),
            }
        });
    }
}
