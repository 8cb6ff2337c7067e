//! Dispatches a rebalance plan and waits for its transactions.
//!
//! Actions run in plan order against a running book of held token ids, so
//! every mint and burn carries the position list it leaves behind. A failed
//! action is reported and skipped; later actions still dispatch. Nothing is
//! rolled back.

use range_keeper_core::{
    ActionExecutor, BurnAndMintRequest, BurnRequest, CollateralQuery, KeeperError, MintRequest,
    PoolSession, Result, TokenId, TxHandle, TxStatus, Venue, MAX_TICK, MIN_TICK,
};
use tracing::{error, info, warn};

use crate::gate::{CyclePermit, CyclePhase};
use crate::types::{ActionOutcome, ActionReport, ExecutionSettings, PlannedAction, RebalancePlan};

/// Polls `handle` until it is terminal or `max_polls` is reached.
///
/// # Errors
///
/// Returns the poll error, or [`KeeperError::ConfirmationTimeout`] when the
/// cap is hit.
pub async fn await_confirmation<V>(
    venue: &V,
    handle: &TxHandle,
    settings: &ExecutionSettings,
) -> Result<TxStatus>
where
    V: ActionExecutor + ?Sized,
{
    for attempt in 1..=settings.max_confirmation_polls {
        let status = venue.transaction_status(handle).await?;
        if status.is_terminal() {
            info!(tx_hash = %handle, ?status, attempt, "Transaction settled");
            return Ok(status);
        }
        if attempt < settings.max_confirmation_polls {
            tokio::time::sleep(settings.confirmation_interval).await;
        }
    }
    Err(KeeperError::ConfirmationTimeout {
        tx_hash: handle.tx_hash.clone(),
        attempts: settings.max_confirmation_polls,
    })
}

/// An action whose last transaction still has to be confirmed.
struct Dispatched {
    action: PlannedAction,
    /// Hashes already confirmed within the action (mint of mint-then-burn).
    settled: Vec<String>,
    pending: TxHandle,
}

enum Step {
    Sent(Dispatched),
    Done(ActionReport),
}

/// Runs the plan against the venue.
pub struct PlanExecutor<'a, V: Venue + ?Sized> {
    venue: &'a V,
    session: &'a PoolSession,
    settings: &'a ExecutionSettings,
    collateral_tick: i32,
}

impl<'a, V: Venue + ?Sized> PlanExecutor<'a, V> {
    #[must_use]
    pub fn new(
        venue: &'a V,
        session: &'a PoolSession,
        settings: &'a ExecutionSettings,
        collateral_tick: i32,
    ) -> Self {
        Self {
            venue,
            session,
            settings,
            collateral_tick,
        }
    }

    /// Dispatches every action, then polls each transaction.
    pub async fn execute(
        &self,
        plan: &RebalancePlan,
        held: &[TokenId],
        permit: &CyclePermit,
    ) -> Vec<ActionReport> {
        let mut book: Vec<TokenId> = held.to_vec();
        let mut reports = Vec::with_capacity(plan.len());
        let mut dispatched = Vec::new();

        for planned in &plan.actions {
            let action = covered_or_replace(*planned, &book);
            info!(%action, "Dispatching");
            match self.dispatch(action, &mut book).await {
                Ok(Step::Sent(sent)) => dispatched.push(sent),
                Ok(Step::Done(report)) => reports.push(report),
                Err(err) => {
                    error!(%action, error = %err, "Action failed");
                    reports.push(ActionReport {
                        action,
                        outcome: outcome_for_error(&err),
                    });
                }
            }
        }

        permit.advance(CyclePhase::AwaitingConfirmation);
        for sent in dispatched {
            let outcome = match await_confirmation(self.venue, &sent.pending, self.settings).await {
                Ok(status) => {
                    let mut hashes = sent.settled;
                    hashes.push(sent.pending.tx_hash.clone());
                    ActionOutcome::from_status(hashes, status)
                }
                Err(err) => {
                    warn!(action = %sent.action, error = %err, "Confirmation incomplete");
                    outcome_for_error(&err)
                }
            };
            reports.push(ActionReport {
                action: sent.action,
                outcome,
            });
        }
        reports
    }

    async fn dispatch(&self, action: PlannedAction, book: &mut Vec<TokenId>) -> Result<Step> {
        match action {
            PlannedAction::Open { token_id } => {
                let mut next = book.clone();
                next.push(token_id);
                self.ensure_collateral(&next).await?;
                let handle = self.venue.mint(&self.mint_request(next.clone())).await?;
                info!(tx_hash = %handle, %token_id, "Mint submitted");
                *book = next;
                Ok(Step::Sent(Dispatched {
                    action,
                    settled: Vec::new(),
                    pending: handle,
                }))
            }
            PlannedAction::Replace { stale, replacement } => {
                let postburn: Vec<TokenId> = book.iter().copied().filter(|id| *id != stale).collect();
                let mut minted = postburn.clone();
                minted.push(replacement);
                self.ensure_collateral(&minted).await?;

                if self.settings.use_burn_and_mint {
                    let handle = self
                        .venue
                        .burn_and_mint(&BurnAndMintRequest {
                            panoptic_pool: self.session.panoptic_pool.clone(),
                            burn_token_id: stale,
                            postburn_position_id_list: postburn,
                            mint_token_id: replacement,
                            position_size: self.settings.position_size,
                            effective_liquidity_limit: self.settings.effective_liquidity_limit,
                            burn_tick_limit_low: MIN_TICK,
                            burn_tick_limit_high: MAX_TICK,
                            mint_tick_limit_low: MIN_TICK,
                            mint_tick_limit_high: MAX_TICK,
                        })
                        .await?;
                    info!(tx_hash = %handle, %stale, %replacement, "Burn-and-mint submitted");
                    *book = minted;
                    return Ok(Step::Sent(Dispatched {
                        action,
                        settled: Vec::new(),
                        pending: handle,
                    }));
                }

                // Mint first so coverage never lapses; burn only once it lands.
                let mut with_both = book.clone();
                with_both.push(replacement);
                let mint = self.venue.mint(&self.mint_request(with_both.clone())).await?;
                info!(tx_hash = %mint, %replacement, "Mint submitted");
                let status = await_confirmation(self.venue, &mint, self.settings).await?;
                if status != TxStatus::Success {
                    return Ok(Step::Done(ActionReport {
                        action,
                        outcome: ActionOutcome::Failed {
                            tx_hash: mint.tx_hash,
                        },
                    }));
                }
                *book = with_both;

                let burn = self.venue.burn(&self.burn_request(stale, &minted)).await?;
                info!(tx_hash = %burn, %stale, "Burn submitted");
                *book = minted;
                Ok(Step::Sent(Dispatched {
                    action,
                    settled: vec![mint.tx_hash],
                    pending: burn,
                }))
            }
            PlannedAction::Retire { stale, .. } => {
                let remaining: Vec<TokenId> = book.iter().copied().filter(|id| *id != stale).collect();
                let handle = self.venue.burn(&self.burn_request(stale, &remaining)).await?;
                info!(tx_hash = %handle, %stale, "Burn submitted");
                *book = remaining;
                Ok(Step::Sent(Dispatched {
                    action,
                    settled: Vec::new(),
                    pending: handle,
                }))
            }
        }
    }

    async fn ensure_collateral(&self, position_id_list: &[TokenId]) -> Result<()> {
        let report = self
            .venue
            .check_collateral(&CollateralQuery {
                panoptic_pool: self.session.panoptic_pool.clone(),
                at_tick: self.collateral_tick,
                position_id_list: position_id_list.to_vec(),
            })
            .await?;
        info!(
            at_tick = self.collateral_tick,
            balance0 = %report.balance0,
            required0 = %report.required0,
            balance1 = %report.balance1,
            required1 = %report.required1,
            "Collateral checked"
        );
        match report.shortfall() {
            Some((token, balance, required)) => Err(KeeperError::CollateralInsufficient {
                token,
                balance,
                required,
            }),
            None => Ok(()),
        }
    }

    fn mint_request(&self, position_id_list: Vec<TokenId>) -> MintRequest {
        MintRequest {
            panoptic_pool: self.session.panoptic_pool.clone(),
            position_id_list,
            position_size: self.settings.position_size,
            effective_liquidity_limit: self.settings.effective_liquidity_limit,
        }
    }

    fn burn_request(&self, burn_token_id: TokenId, remaining: &[TokenId]) -> BurnRequest {
        BurnRequest {
            panoptic_pool: self.session.panoptic_pool.clone(),
            burn_token_id,
            new_position_id_list: remaining.to_vec(),
            tick_limit_low: MIN_TICK,
            tick_limit_high: MAX_TICK,
        }
    }
}

/// A retire only burns when its covering id is in the book. If the action
/// that should have minted it failed, the stale position is replaced instead.
fn covered_or_replace(action: PlannedAction, book: &[TokenId]) -> PlannedAction {
    match action {
        PlannedAction::Retire { stale, covered_by } if !book.contains(&covered_by) => {
            warn!(%stale, %covered_by, "Covering position was not minted, replacing instead");
            PlannedAction::Replace {
                stale,
                replacement: covered_by,
            }
        }
        other => other,
    }
}

fn outcome_for_error(err: &KeeperError) -> ActionOutcome {
    match err {
        KeeperError::CollateralInsufficient {
            token,
            balance,
            required,
        } => ActionOutcome::CollateralShortfall {
            token: *token,
            balance: *balance,
            required: *required,
        },
        KeeperError::ConfirmationTimeout { tx_hash, .. } => ActionOutcome::Unconfirmed {
            tx_hash: tx_hash.clone(),
        },
        other => ActionOutcome::Errored {
            message: other.to_string(),
        },
    }
}
