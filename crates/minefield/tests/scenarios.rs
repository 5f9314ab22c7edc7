//! End-to-end rounds through `MinefieldService`: deal, play, settle.
//!
//! Boards are predicted with a twin engine built from the same seed: the
//! service's first round on seed `N` has the same layout as the first
//! round a fresh `RoundEngine::with_seed(_, N)` deals.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use minefield::prelude::*;
use minefield_ledger::{BalanceChange, Player};
use minefield_round::Round;

// =========================================================================
// Helpers
// =========================================================================

const SEED: u64 = 77;

fn pid(s: &str) -> PlayerId {
    PlayerId::new(s)
}

fn stake() -> Amount {
    Amount::from_units(20)
}

fn service_with<S: LedgerStore>(store: S, retry: RetryPolicy) -> MinefieldService<S> {
    let engine = RoundEngine::with_seed(EngineConfig::default(), SEED).unwrap();
    let ledger = LedgerService::new(
        store,
        LedgerConfig {
            retry,
            ..LedgerConfig::default()
        },
    );
    MinefieldService::new(engine, ledger)
}

fn service() -> MinefieldService<MemoryStore> {
    service_with(MemoryStore::new(), RetryPolicy::default())
}

/// The board the service will deal first for a given grid.
fn twin_round(rows: usize, cols: usize, mines: usize) -> Round {
    RoundEngine::with_seed(EngineConfig::default(), SEED)
        .unwrap()
        .create_round(rows, cols, mines, stake())
        .unwrap()
}

fn safe_cells(round: &Round) -> Vec<usize> {
    (0..round.board().len())
        .filter(|i| !round.board().is_mine(*i))
        .collect()
}

/// A store whose writes fail on demand before reaching a [`MemoryStore`].
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    balance_failures: AtomicU32,
    record_failures: AtomicU32,
}

impl FlakyStore {
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl LedgerStore for FlakyStore {
    async fn get_or_create_player(
        &self,
        player_id: &PlayerId,
        starting_balance: Amount,
    ) -> Result<Player, LedgerError> {
        self.inner
            .get_or_create_player(player_id, starting_balance)
            .await
    }

    async fn get_player(&self, player_id: &PlayerId) -> Result<Option<Player>, LedgerError> {
        self.inner.get_player(player_id).await
    }

    async fn atomic_add_balance(
        &self,
        player_id: &PlayerId,
        round_id: &RoundId,
        delta: Amount,
    ) -> Result<BalanceChange, LedgerError> {
        if Self::take(&self.balance_failures) {
            return Err(LedgerError::PersistenceUnavailable("balance".into()));
        }
        self.inner
            .atomic_add_balance(player_id, round_id, delta)
            .await
    }

    async fn append_game_record(&self, record: GameRecord) -> Result<bool, LedgerError> {
        if Self::take(&self.record_failures) {
            return Err(LedgerError::PersistenceUnavailable("record".into()));
        }
        self.inner.append_game_record(record).await
    }

    async fn sum_profit_by_player(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        self.inner.sum_profit_by_player(since, limit).await
    }
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn test_three_safe_reveals_then_cashout_pays_schedule() {
    let svc = service();
    let alice = pid("alice");
    assert_eq!(svc.register(&alice).await.unwrap(), Amount::from_units(1000));

    let twin = twin_round(5, 5, 7);
    svc.start_round(&alice, 5, 5, 7, stake()).await.unwrap();

    for (i, cell) in safe_cells(&twin).into_iter().take(3).enumerate() {
        let report = svc.reveal(&alice, cell).await.unwrap();
        assert!(matches!(report.outcome, RevealOutcome::Continue { .. }));
        assert_eq!(report.round.safe_revealed, i + 1);
        assert!(report.settlement.is_none());
    }

    let report = svc.cashout(&alice).await.unwrap();

    let multiplier = MultiplierCurve::default().multiplier(25, 7, 3);
    let expected_profit = stake().scale(multiplier - 1.0);
    assert_eq!(report.outcome, RevealOutcome::Won { multiplier });
    assert_eq!(report.settlement.profit, expected_profit);
    assert!(expected_profit.is_positive());
    assert_eq!(
        svc.balance(&alice).await.unwrap(),
        Amount::from_units(1000) + expected_profit
    );

    let records = svc.ledger().store().records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].player_id, alice);
    assert_eq!(records[0].profit, expected_profit);
    assert_eq!(records[0].round_id, report.round.round_id);
}

#[tokio::test]
async fn test_mine_on_first_reveal_loses_stake() {
    let svc = service();
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();

    let twin = twin_round(5, 5, 7);
    svc.start_round(&alice, 5, 5, 7, stake()).await.unwrap();

    let mine = twin.board().mine_positions()[0];
    let report = svc.reveal(&alice, mine).await.unwrap();

    assert_eq!(report.outcome, RevealOutcome::Lost);
    assert_eq!(report.round.status, RoundStatus::Lost);
    let settlement = report.settlement.unwrap();
    assert_eq!(settlement.profit, Amount::from_units(-20));
    assert_eq!(settlement.balance, Amount::from_units(980));

    // All mines are shown once the round is lost.
    let shown = report
        .round
        .cells
        .iter()
        .filter(|c| **c == CellView::Mine)
        .count();
    assert_eq!(shown, 7);

    let records = svc.ledger().store().records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].profit, Amount::from_units(-20));
}

#[tokio::test]
async fn test_clearing_the_board_settles_automatically() {
    let svc = service();
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();

    let twin = twin_round(3, 3, 8);
    svc.start_round(&alice, 3, 3, 8, stake()).await.unwrap();

    let only_safe = safe_cells(&twin)[0];
    let report = svc.reveal(&alice, only_safe).await.unwrap();

    let multiplier = MultiplierCurve::default().multiplier(9, 8, 1);
    assert_eq!(report.outcome, RevealOutcome::Won { multiplier });
    let settlement = report.settlement.unwrap();
    assert_eq!(settlement.profit, stake().scale(multiplier - 1.0));
}

#[tokio::test]
async fn test_mines_stay_hidden_while_active() {
    let svc = service();
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();

    let twin = twin_round(4, 4, 5);
    svc.start_round(&alice, 4, 4, 5, stake()).await.unwrap();
    svc.reveal(&alice, safe_cells(&twin)[0]).await.unwrap();

    let snapshot = svc.round(&alice).await.unwrap();
    assert!(snapshot.cells.iter().all(|c| *c != CellView::Mine));
    assert_eq!(
        snapshot.cells.iter().filter(|c| **c == CellView::Safe).count(),
        1
    );
}

#[tokio::test]
async fn test_repeat_reveal_does_not_advance() {
    let svc = service();
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();

    let twin = twin_round(5, 5, 3);
    svc.start_round(&alice, 5, 5, 3, stake()).await.unwrap();
    let cell = safe_cells(&twin)[0];

    let first = svc.reveal(&alice, cell).await.unwrap();
    let again = svc.reveal(&alice, cell).await.unwrap();

    assert_eq!(first.outcome, again.outcome);
    assert_eq!(again.round.safe_revealed, 1);
}

#[tokio::test]
async fn test_out_of_range_reveal_is_rejected_without_change() {
    let svc = service();
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();
    svc.start_round(&alice, 3, 3, 2, stake()).await.unwrap();

    let result = svc.reveal(&alice, 9).await;
    assert!(matches!(
        result,
        Err(MinefieldError::Round(RoundError::InvalidCell { cell: 9, cells: 9 }))
    ));
    let snapshot = svc.round(&alice).await.unwrap();
    assert_eq!(snapshot.status, RoundStatus::Active);
    assert_eq!(snapshot.safe_revealed, 0);
}

// =========================================================================
// Settlement failures
// =========================================================================

#[tokio::test]
async fn test_failed_settlement_stays_pending_until_resettled() {
    let svc = service_with(FlakyStore::default(), RetryPolicy::none());
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();

    let twin = twin_round(5, 5, 7);
    svc.start_round(&alice, 5, 5, 7, stake()).await.unwrap();

    svc.ledger()
        .store()
        .balance_failures
        .store(1, Ordering::SeqCst);
    let result = svc.reveal(&alice, twin.board().mine_positions()[0]).await;
    assert!(matches!(
        result,
        Err(MinefieldError::Ledger(LedgerError::PersistenceUnavailable(_)))
    ));

    // Outcome is fixed, money has not moved, nothing new can start.
    assert!(svc.has_pending_settlement(&alice).await);
    assert_eq!(svc.round(&alice).await.unwrap().status, RoundStatus::Lost);
    assert_eq!(svc.balance(&alice).await.unwrap(), Amount::from_units(1000));
    assert!(matches!(
        svc.start_round(&alice, 5, 5, 7, stake()).await,
        Err(MinefieldError::SettlementPending)
    ));
    assert!(matches!(
        svc.reveal(&alice, 0).await,
        Err(MinefieldError::Round(RoundError::RoundNotActive(_)))
    ));

    let settlement = svc.resettle(&alice).await.unwrap();
    assert_eq!(settlement.profit, Amount::from_units(-20));
    assert_eq!(settlement.balance, Amount::from_units(980));
    assert!(!svc.has_pending_settlement(&alice).await);
    assert_eq!(svc.ledger().store().inner.records().await.len(), 1);
}

#[tokio::test]
async fn test_record_failure_resettle_does_not_double_charge() {
    let svc = service_with(FlakyStore::default(), RetryPolicy::none());
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();
    svc.start_round(&alice, 5, 5, 7, stake()).await.unwrap();

    svc.ledger()
        .store()
        .record_failures
        .store(1, Ordering::SeqCst);
    assert!(svc.cashout(&alice).await.is_err());
    assert!(svc.has_pending_settlement(&alice).await);

    let first = svc.resettle(&alice).await.unwrap();
    assert_eq!(first.profit, Amount::ZERO);
    assert_eq!(first.balance, Amount::from_units(1000));
    assert_eq!(svc.ledger().store().inner.records().await.len(), 1);

    assert!(matches!(
        svc.resettle(&alice).await,
        Err(MinefieldError::NoPendingSettlement)
    ));
}

#[tokio::test]
async fn test_transient_failure_is_absorbed_by_retry() {
    let svc = service_with(
        FlakyStore::default(),
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
        },
    );
    let alice = pid("alice");
    svc.register(&alice).await.unwrap();
    svc.start_round(&alice, 5, 5, 7, stake()).await.unwrap();

    svc.ledger()
        .store()
        .balance_failures
        .store(2, Ordering::SeqCst);
    let report = svc.cashout(&alice).await.unwrap();

    assert_eq!(report.settlement.balance, Amount::from_units(1000));
    assert!(!svc.has_pending_settlement(&alice).await);
}

// =========================================================================
// Players in parallel
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_players_settle_independently_in_parallel() {
    let svc = Arc::new(service());

    let mut handles = Vec::new();
    for i in 0..8 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            let player = pid(&format!("p{i}"));
            svc.register(&player).await.unwrap();
            for _ in 0..5 {
                svc.start_round(&player, 3, 3, 1, Amount::from_units(1))
                    .await
                    .unwrap();
                svc.cashout(&player).await.unwrap();
            }
            svc.balance(&player).await.unwrap()
        }));
    }

    for handle in handles {
        // Cashing out with no reveals never moves the balance.
        assert_eq!(handle.await.unwrap(), Amount::from_units(1000));
    }
    assert_eq!(svc.ledger().store().records().await.len(), 40);
}

#[tokio::test]
async fn test_leaderboard_reflects_settled_rounds() {
    let svc = service();
    let alice = pid("alice");
    let bob = pid("bob");
    svc.register(&alice).await.unwrap();
    svc.register(&bob).await.unwrap();

    let twin = twin_round(5, 5, 7);
    svc.start_round(&alice, 5, 5, 7, stake()).await.unwrap();
    svc.reveal(&alice, twin.board().mine_positions()[0])
        .await
        .unwrap();

    svc.start_round(&bob, 3, 3, 1, stake()).await.unwrap();
    svc.cashout(&bob).await.unwrap();

    let entries = svc.leaderboard(LeaderboardWindow::Day).await.unwrap();
    assert_eq!(
        entries,
        vec![
            LeaderboardEntry {
                player_id: bob,
                total: Amount::ZERO,
            },
            LeaderboardEntry {
                player_id: alice,
                total: Amount::from_units(-20),
            },
        ]
    );
}
