//! End-to-end keeper cycles against an in-memory venue.
//!
//! Covers:
//! - Opening a straddle when nothing is held
//! - Replacing only out-of-range positions (burn-and-mint and mint-then-burn)
//! - Retiring a second stale position when the replacement is already minted,
//!   and replacing it instead when that mint failed
//! - Dropped triggers while a cycle holds the gate
//! - Collateral shortfall and confirmation timeouts

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use range_keeper_core::{
    tick_to_absolute_price, ActionExecutor, AppConfig, BurnAndMintRequest, BurnRequest,
    CollateralOracle, CollateralQuery, CollateralReport, KeeperError, MintRequest, PoolMetadata,
    PoolSession, PositionLeg, PositionQuery, PriceFeed, Result, SessionResolver, StraddleSpec,
    TickLadder, TokenId, TokenInfo, TxHandle, TxStatus, MAX_TICK, MIN_TICK, U256,
};
use range_keeper_data::SpotLog;
use range_keeper_options_manager::{
    ActionOutcome, CycleOutcome, CyclePhase, CycleReport, Keeper, PlannedAction,
};
use tempfile::TempDir;

// =============================================================================
// Mock venue
// =============================================================================

const STRADDLE_ID: u64 = 0x900;

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<&'static str>,
    straddles: Vec<StraddleSpec>,
    collateral: Vec<CollateralQuery>,
    mints: Vec<MintRequest>,
    burns: Vec<BurnRequest>,
    burn_and_mints: Vec<BurnAndMintRequest>,
}

struct MockVenue {
    spot_price: f64,
    positions: Vec<(TokenId, Vec<PositionLeg>)>,
    collateral: CollateralReport,
    /// Leading collateral checks answered with a token1 shortfall.
    short_checks: usize,
    pending_polls: u32,
    recorded: Mutex<Recorded>,
    polls: Mutex<u32>,
}

impl MockVenue {
    /// Spot sits at tick 250.5 on a `[100, 200, 300]` ladder with spacing 60.
    fn new(positions: Vec<(TokenId, Vec<PositionLeg>)>) -> Self {
        Self {
            spot_price: tick_to_absolute_price(250.5),
            positions,
            collateral: CollateralReport {
                balance0: U256::from(1_000u64),
                balance1: U256::from(1_000u64),
                required0: U256::from(10u64),
                required1: U256::from(10u64),
            },
            short_checks: 0,
            pending_polls: 1,
            recorded: Mutex::new(Recorded::default()),
            polls: Mutex::new(0),
        }
    }

    fn record(&self, call: &'static str) {
        self.recorded.lock().calls.push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.recorded.lock().calls.clone()
    }

    fn clear(&self) {
        *self.recorded.lock() = Recorded::default();
    }
}

#[async_trait]
impl SessionResolver for MockVenue {
    async fn token_info(&self, symbol: &str) -> Result<TokenInfo> {
        self.record("token_info");
        Ok(TokenInfo {
            symbol: symbol.to_string(),
            address: format!("0x{}", symbol.to_lowercase()),
            decimals: 18,
        })
    }

    async fn uniswap_pool(&self, _t0: &TokenInfo, _t1: &TokenInfo, _fee: u32) -> Result<String> {
        self.record("uniswap_pool");
        Ok("0xuni".to_string())
    }

    async fn panoptic_pool(&self, _uniswap_pool: &str) -> Result<String> {
        self.record("panoptic_pool");
        Ok("0xpanoptic".to_string())
    }
}

#[async_trait]
impl PoolMetadata for MockVenue {
    async fn tick_spacing_and_ladder(&self, _uniswap_pool: &str) -> Result<(i32, TickLadder)> {
        self.record("tick_spacing_and_ladder");
        Ok((60, TickLadder::new(vec![100, 200, 300])?))
    }
}

#[async_trait]
impl PriceFeed for MockVenue {
    async fn spot_price(&self, _session: &PoolSession) -> Result<f64> {
        self.record("spot_price");
        Ok(self.spot_price)
    }
}

#[async_trait]
impl PositionQuery for MockVenue {
    async fn open_positions(&self, _panoptic_pool: &str) -> Result<Vec<TokenId>> {
        self.record("open_positions");
        Ok(self.positions.iter().map(|(id, _)| *id).collect())
    }

    async fn unwrap_position(&self, token_id: &TokenId) -> Result<Vec<PositionLeg>> {
        self.record("unwrap_position");
        self.positions
            .iter()
            .find(|(id, _)| id == token_id)
            .map(|(_, legs)| legs.clone())
            .ok_or_else(|| KeeperError::venue("options/unwrapTokenId", "unknown token id"))
    }
}

#[async_trait]
impl ActionExecutor for MockVenue {
    async fn create_straddle(&self, spec: &StraddleSpec) -> Result<TokenId> {
        self.record("create_straddle");
        self.recorded.lock().straddles.push(spec.clone());
        Ok(TokenId::from(STRADDLE_ID))
    }

    async fn mint(&self, request: &MintRequest) -> Result<TxHandle> {
        self.record("mint");
        self.recorded.lock().mints.push(request.clone());
        Ok(TxHandle {
            tx_hash: "0xmint".to_string(),
        })
    }

    async fn burn(&self, request: &BurnRequest) -> Result<TxHandle> {
        self.record("burn");
        let mut recorded = self.recorded.lock();
        recorded.burns.push(request.clone());
        Ok(TxHandle {
            tx_hash: format!("0xburn{}", recorded.burns.len()),
        })
    }

    async fn burn_and_mint(&self, request: &BurnAndMintRequest) -> Result<TxHandle> {
        self.record("burn_and_mint");
        self.recorded.lock().burn_and_mints.push(request.clone());
        Ok(TxHandle {
            tx_hash: "0xboth".to_string(),
        })
    }

    async fn transaction_status(&self, _handle: &TxHandle) -> Result<TxStatus> {
        self.record("transaction_status");
        let mut polls = self.polls.lock();
        *polls += 1;
        if *polls > self.pending_polls {
            *polls = 0;
            Ok(TxStatus::Success)
        } else {
            Ok(TxStatus::Pending)
        }
    }
}

#[async_trait]
impl CollateralOracle for MockVenue {
    async fn check_collateral(&self, query: &CollateralQuery) -> Result<CollateralReport> {
        self.record("check_collateral");
        let mut recorded = self.recorded.lock();
        recorded.collateral.push(query.clone());
        if recorded.collateral.len() <= self.short_checks {
            return Ok(CollateralReport {
                balance1: U256::from(3u64),
                ..self.collateral
            });
        }
        Ok(self.collateral)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn leg(strike: i32, width: i32) -> PositionLeg {
    PositionLeg {
        asset: 0,
        is_long: false,
        token_type: 0,
        option_ratio: 1,
        risk_partner: 0,
        strike,
        width,
    }
}

fn id(raw: u64) -> TokenId {
    TokenId::from(raw)
}

fn config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.pair.wallet_address = "0xwallet".to_string();
    config.pair.token0 = "WETH".to_string();
    config.pair.token1 = "USDC".to_string();
    config.strategy.confirmation_poll_ms = 1;
    config.strategy.max_confirmation_polls = 5;
    config.strategy.spot_log_path = dir
        .path()
        .join("logs")
        .join("spot_data.dat")
        .to_string_lossy()
        .into_owned();
    config
}

async fn keeper(venue: MockVenue, config: AppConfig) -> (Arc<MockVenue>, Keeper<MockVenue>) {
    let venue = Arc::new(venue);
    let keeper = Keeper::initialize(Arc::clone(&venue), config)
        .await
        .expect("session resolves");
    venue.clear();
    (venue, keeper)
}

async fn completed(keeper: &Keeper<MockVenue>) -> CycleReport {
    match keeper.run_cycle().await.expect("cycle succeeds") {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::Skipped => panic!("cycle unexpectedly skipped"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn session_is_resolved_once() {
    let dir = TempDir::new().unwrap();
    let venue = Arc::new(MockVenue::new(vec![]));
    let keeper = Keeper::initialize(Arc::clone(&venue), config(&dir)).await.unwrap();

    let session = keeper.session();
    assert_eq!(session.token0.address, "0xweth");
    assert_eq!(session.uniswap_pool, "0xuni");
    assert_eq!(session.panoptic_pool, "0xpanoptic");
    assert_eq!(session.tick_spacing, 60);
    assert_eq!(
        venue.calls(),
        vec![
            "token_info",
            "token_info",
            "uniswap_pool",
            "panoptic_pool",
            "tick_spacing_and_ladder"
        ]
    );
    assert_eq!(keeper.phase(), CyclePhase::Idle);
}

#[tokio::test]
async fn missing_wallet_is_fatal_before_any_call() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.pair.wallet_address.clear();
    let venue = Arc::new(MockVenue::new(vec![]));

    let err = Keeper::initialize(Arc::clone(&venue), config).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(venue.calls().is_empty());
}

#[tokio::test]
async fn empty_book_opens_centred_straddle() {
    let dir = TempDir::new().unwrap();
    let (venue, keeper) = keeper(MockVenue::new(vec![]), config(&dir)).await;

    let report = completed(&keeper).await;
    assert_eq!(report.context.at_tick, 250);
    assert_eq!(report.context.collateral_tick, 300);
    assert_eq!(
        report.plan.actions,
        vec![PlannedAction::Open {
            token_id: id(STRADDLE_ID)
        }]
    );
    assert!(report.actions[0].outcome.is_confirmed());

    let recorded = venue.recorded.lock();
    // 1H on spacing 60 is 2 units; floor(250 / 60) * 60 = 240 is aligned.
    assert_eq!(recorded.straddles, vec![StraddleSpec::short("0xuni", 240, 2)]);
    assert_eq!(recorded.collateral[0].at_tick, 300);
    assert_eq!(recorded.collateral[0].position_id_list, vec![id(STRADDLE_ID)]);
    assert_eq!(recorded.mints.len(), 1);
    assert_eq!(recorded.mints[0].position_id_list, vec![id(STRADDLE_ID)]);
    assert_eq!(recorded.mints[0].position_size, U256::exp10(25));
    assert!(recorded.burns.is_empty());
    drop(recorded);

    assert_eq!(keeper.phase(), CyclePhase::Idle);
    assert!(keeper.gate().is_ready());
}

#[tokio::test]
async fn in_range_positions_are_left_alone() {
    let dir = TempDir::new().unwrap();
    let venue = MockVenue::new(vec![(id(1), vec![leg(240, 2)]), (id(2), vec![leg(150, 2)])]);
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let report = completed(&keeper).await;
    assert_eq!(report.open_positions, 2);
    assert!(report.out_of_range.is_empty());
    assert!(report.plan.is_empty());
    let calls = venue.calls();
    assert!(!calls.contains(&"create_straddle"));
    assert!(!calls.contains(&"mint"));
    assert!(!calls.contains(&"burn"));
}

#[tokio::test]
async fn only_stale_position_is_replaced() {
    let dir = TempDir::new().unwrap();
    let venue = MockVenue::new(vec![(id(1), vec![leg(-6_000, 2)]), (id(2), vec![leg(240, 2)])]);
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let report = completed(&keeper).await;
    assert_eq!(report.out_of_range, vec![id(1)]);
    assert_eq!(
        report.plan.actions,
        vec![PlannedAction::Replace {
            stale: id(1),
            replacement: id(STRADDLE_ID)
        }]
    );
    assert_eq!(
        report.actions[0].outcome,
        ActionOutcome::Confirmed {
            tx_hashes: vec!["0xboth".to_string()]
        }
    );

    let recorded = venue.recorded.lock();
    assert_eq!(recorded.burn_and_mints.len(), 1);
    let request = &recorded.burn_and_mints[0];
    assert_eq!(request.burn_token_id, id(1));
    assert_eq!(request.postburn_position_id_list, vec![id(2)]);
    assert_eq!(request.mint_token_id, id(STRADDLE_ID));
    assert_eq!(request.burn_tick_limit_low, MIN_TICK);
    assert_eq!(request.mint_tick_limit_high, MAX_TICK);
    assert_eq!(
        recorded.collateral[0].position_id_list,
        vec![id(2), id(STRADDLE_ID)]
    );
    assert!(recorded.mints.is_empty());
    assert!(recorded.burns.is_empty());
}

#[tokio::test]
async fn mint_then_burn_when_combined_call_disabled() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.strategy.use_burn_and_mint = false;
    let venue = MockVenue::new(vec![(id(1), vec![leg(-6_000, 2)]), (id(2), vec![leg(240, 2)])]);
    let (venue, keeper) = keeper(venue, config).await;

    let report = completed(&keeper).await;
    assert_eq!(
        report.actions[0].outcome,
        ActionOutcome::Confirmed {
            tx_hashes: vec!["0xmint".to_string(), "0xburn1".to_string()]
        }
    );

    let recorded = venue.recorded.lock();
    assert_eq!(
        recorded.mints[0].position_id_list,
        vec![id(1), id(2), id(STRADDLE_ID)]
    );
    assert_eq!(recorded.burns[0].burn_token_id, id(1));
    assert_eq!(
        recorded.burns[0].new_position_id_list,
        vec![id(2), id(STRADDLE_ID)]
    );
    assert!(recorded.burn_and_mints.is_empty());
    drop(recorded);

    let calls = venue.calls();
    let mint_at = calls.iter().position(|c| *c == "mint").unwrap();
    let burn_at = calls.iter().position(|c| *c == "burn").unwrap();
    assert!(mint_at < burn_at);
}

#[tokio::test]
async fn two_stale_positions_share_one_replacement() {
    let dir = TempDir::new().unwrap();
    let venue = MockVenue::new(vec![
        (id(1), vec![leg(-6_000, 2)]),
        (id(2), vec![leg(9_000, 2)]),
    ]);
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let report = completed(&keeper).await;
    assert_eq!(
        report.plan.actions,
        vec![
            PlannedAction::Replace {
                stale: id(1),
                replacement: id(STRADDLE_ID)
            },
            PlannedAction::Retire {
                stale: id(2),
                covered_by: id(STRADDLE_ID)
            },
        ]
    );
    assert!(report.actions.iter().all(|a| a.outcome.is_confirmed()));

    let recorded = venue.recorded.lock();
    assert_eq!(recorded.straddles.len(), 1);
    assert_eq!(recorded.burn_and_mints[0].postburn_position_id_list, vec![id(2)]);
    assert_eq!(recorded.burns[0].burn_token_id, id(2));
    assert_eq!(recorded.burns[0].new_position_id_list, vec![id(STRADDLE_ID)]);
}

#[tokio::test]
async fn stale_position_kept_when_replacement_never_minted() {
    let dir = TempDir::new().unwrap();
    let mut venue = MockVenue::new(vec![
        (id(1), vec![leg(-6_000, 2)]),
        (id(2), vec![leg(9_000, 2)]),
    ]);
    venue.short_checks = usize::MAX;
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let report = completed(&keeper).await;
    let shortfall = ActionOutcome::CollateralShortfall {
        token: 1,
        balance: U256::from(3u64),
        required: U256::from(10u64),
    };
    assert_eq!(report.actions.len(), 2);
    assert_eq!(report.actions[0].outcome, shortfall);
    assert_eq!(
        report.actions[1].action,
        PlannedAction::Replace {
            stale: id(2),
            replacement: id(STRADDLE_ID)
        }
    );
    assert_eq!(report.actions[1].outcome, shortfall);

    let recorded = venue.recorded.lock();
    assert!(recorded.burns.is_empty());
    assert!(recorded.mints.is_empty());
    assert!(recorded.burn_and_mints.is_empty());
}

#[tokio::test]
async fn failed_action_does_not_stop_later_ones() {
    let dir = TempDir::new().unwrap();
    let mut venue = MockVenue::new(vec![
        (id(1), vec![leg(-6_000, 2)]),
        (id(2), vec![leg(9_000, 2)]),
    ]);
    venue.short_checks = 1;
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let report = completed(&keeper).await;
    assert_eq!(report.actions.len(), 2);
    assert!(matches!(
        report.actions[0].outcome,
        ActionOutcome::CollateralShortfall { token: 1, .. }
    ));
    // The second stale position takes over the replacement mint.
    assert_eq!(
        report.actions[1].action,
        PlannedAction::Replace {
            stale: id(2),
            replacement: id(STRADDLE_ID)
        }
    );
    assert_eq!(
        report.actions[1].outcome,
        ActionOutcome::Confirmed {
            tx_hashes: vec!["0xboth".to_string()]
        }
    );

    let recorded = venue.recorded.lock();
    assert_eq!(recorded.burn_and_mints.len(), 1);
    assert_eq!(recorded.burn_and_mints[0].burn_token_id, id(2));
    assert_eq!(recorded.burn_and_mints[0].postburn_position_id_list, vec![id(1)]);
    assert!(recorded.burns.is_empty());
    drop(recorded);
    assert!(venue.calls().contains(&"transaction_status"));
}

#[tokio::test]
async fn busy_gate_drops_trigger_without_calls() {
    let dir = TempDir::new().unwrap();
    let (venue, keeper) = keeper(MockVenue::new(vec![]), config(&dir)).await;

    let permit = keeper.gate().try_acquire().unwrap();
    assert_eq!(keeper.run_cycle().await.unwrap(), CycleOutcome::Skipped);
    assert!(venue.calls().is_empty());

    drop(permit);
    assert!(matches!(
        keeper.run_cycle().await.unwrap(),
        CycleOutcome::Completed(_)
    ));
}

#[tokio::test]
async fn collateral_shortfall_blocks_mint() {
    let dir = TempDir::new().unwrap();
    let mut venue = MockVenue::new(vec![]);
    venue.collateral.balance1 = U256::from(3u64);
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let report = completed(&keeper).await;
    assert_eq!(
        report.actions[0].outcome,
        ActionOutcome::CollateralShortfall {
            token: 1,
            balance: U256::from(3u64),
            required: U256::from(10u64),
        }
    );
    let calls = venue.calls();
    assert!(calls.contains(&"check_collateral"));
    assert!(!calls.contains(&"mint"));
    assert!(keeper.gate().is_ready());
}

#[tokio::test]
async fn unconfirmed_transaction_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.strategy.max_confirmation_polls = 3;
    let mut venue = MockVenue::new(vec![]);
    venue.pending_polls = u32::MAX;
    let (venue, keeper) = keeper(venue, config).await;

    let report = completed(&keeper).await;
    assert_eq!(
        report.actions[0].outcome,
        ActionOutcome::Unconfirmed {
            tx_hash: "0xmint".to_string()
        }
    );
    let polls = venue
        .calls()
        .iter()
        .filter(|c| **c == "transaction_status")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn non_positive_price_aborts_before_side_effects() {
    let dir = TempDir::new().unwrap();
    let mut venue = MockVenue::new(vec![]);
    venue.spot_price = 0.0;
    let (venue, keeper) = keeper(venue, config(&dir)).await;

    let err = keeper.run_cycle().await.unwrap_err();
    assert!(matches!(err, KeeperError::Domain(_)));
    assert_eq!(venue.calls(), vec!["spot_price"]);
    assert!(keeper.gate().is_ready());
    assert_eq!(keeper.phase(), CyclePhase::Idle);
}

#[tokio::test]
async fn every_cycle_appends_spot_record() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let path = config.strategy.spot_log_path.clone();
    let venue = MockVenue::new(vec![(id(1), vec![leg(240, 2)])]);
    let (_venue, keeper) = keeper(venue, config).await;

    completed(&keeper).await;
    completed(&keeper).await;

    let records = SpotLog::new(path).unwrap().read().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].pool_id, "0xuni");
    assert!((records[0].spot_tick - 250.5).abs() < 1e-6);
}

#[tokio::test]
async fn service_exits_when_stop_is_set() {
    let dir = TempDir::new().unwrap();
    let (venue, keeper) = keeper(MockVenue::new(vec![]), config(&dir)).await;

    let stop = Arc::new(AtomicBool::new(true));
    range_keeper_options_manager::run(Arc::new(keeper), stop)
        .await
        .unwrap();
    assert!(venue.calls().is_empty());
}
