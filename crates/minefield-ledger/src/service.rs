//! The ledger service: registration, settlement, and leaderboards.
//!
//! # Settlement
//!
//! A terminated round becomes a [`Settlement`]. [`LedgerService::settle_round`]
//! applies it in two steps, each retried on its own:
//!
//! 1. `settle`: add the profit to the player's balance (keyed by round id)
//! 2. `record`: append the [`GameRecord`](crate::GameRecord) (keyed by round id)
//!
//! If step 1 succeeds and step 2 exhausts its retries, the balance has
//! moved but the record is missing. Calling `settle_round` again with the
//! same settlement skips the balance change and appends the record, so
//! the caller only has to hold on to the `Settlement` until it succeeds.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use minefield_protocol::{Amount, LeaderboardEntry, LeaderboardWindow, PlayerId, RoundId};

use crate::{LedgerConfig, LedgerError, LedgerStore, Player, Settlement, SettlementReceipt};

/// Start of a leaderboard window as seen at `now`.
///
/// - `Day` starts at 00:00 UTC of `now`'s calendar day
/// - `Week` is the trailing seven days
pub fn window_start(window: LeaderboardWindow, now: DateTime<Utc>) -> DateTime<Utc> {
    match window {
        LeaderboardWindow::Day => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
        LeaderboardWindow::Week => now - Duration::days(7),
    }
}

/// Owns a [`LedgerStore`] and applies the ledger rules on top of it.
pub struct LedgerService<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Returns the player, creating it with the starting balance on first
    /// contact. Concurrent first contacts create a single player.
    pub async fn register(&self, player_id: &PlayerId) -> Result<Player, LedgerError> {
        self.with_retry("register", || {
            self.store
                .get_or_create_player(player_id, self.config.starting_balance)
        })
        .await
    }

    /// Current balance of a registered player.
    pub async fn balance(&self, player_id: &PlayerId) -> Result<Amount, LedgerError> {
        let player = self
            .with_retry("balance", || self.store.get_player(player_id))
            .await?;
        player
            .map(|p| p.balance)
            .ok_or_else(|| LedgerError::PlayerNotFound(player_id.clone()))
    }

    /// Applies the settlement's profit to the balance, once per round id.
    ///
    /// Returns the post-settlement balance and whether this call applied
    /// the change (`false` means an earlier attempt already did).
    pub async fn settle(&self, settlement: &Settlement) -> Result<(Amount, bool), LedgerError> {
        let change = self
            .with_retry("settle", || {
                self.store.atomic_add_balance(
                    &settlement.player_id,
                    &settlement.round_id,
                    settlement.profit,
                )
            })
            .await?;
        Ok((change.balance, change.applied))
    }

    /// Appends the settlement's game record, once per round id.
    pub async fn record(&self, settlement: &Settlement) -> Result<(), LedgerError> {
        let appended = self
            .with_retry("record", || {
                self.store.append_game_record(settlement.to_record())
            })
            .await?;
        if !appended {
            tracing::debug!(round_id = %settlement.round_id, "game record already present");
        }
        Ok(())
    }

    /// Appends a game record for a round whose balance change is handled
    /// elsewhere. Stamped with the current time; idempotent by round id.
    pub async fn record_round(
        &self,
        player_id: &PlayerId,
        round_id: &RoundId,
        profit: Amount,
    ) -> Result<(), LedgerError> {
        let settlement = Settlement::new(player_id.clone(), round_id.clone(), profit);
        self.record(&settlement).await
    }

    /// Settles a round durably: balance first, then the record.
    ///
    /// Safe to call again with the same settlement after any failure.
    pub async fn settle_round(
        &self,
        settlement: &Settlement,
    ) -> Result<SettlementReceipt, LedgerError> {
        let (balance, applied) = self.settle(settlement).await?;
        self.record(settlement).await?;

        tracing::info!(
            player_id = %settlement.player_id,
            round_id = %settlement.round_id,
            profit = %settlement.profit,
            %balance,
            replayed = !applied,
            "round settled"
        );

        Ok(SettlementReceipt {
            round_id: settlement.round_id.clone(),
            player_id: settlement.player_id.clone(),
            profit: settlement.profit,
            balance,
            replayed: !applied,
        })
    }

    /// Settles a lost round: the whole stake is deducted.
    pub async fn settle_loss(
        &self,
        player_id: &PlayerId,
        round_id: &RoundId,
        stake: Amount,
    ) -> Result<SettlementReceipt, LedgerError> {
        if !stake.is_positive() {
            return Err(LedgerError::InvalidSettlement(format!(
                "stake must be positive, got {stake}"
            )));
        }
        let settlement = Settlement::new(player_id.clone(), round_id.clone(), -stake);
        self.settle_round(&settlement).await
    }

    /// Settles a won round with the given non-negative profit.
    pub async fn settle_win(
        &self,
        player_id: &PlayerId,
        round_id: &RoundId,
        profit: Amount,
    ) -> Result<SettlementReceipt, LedgerError> {
        if profit.is_negative() {
            return Err(LedgerError::InvalidSettlement(format!(
                "win profit must not be negative, got {profit}"
            )));
        }
        let settlement = Settlement::new(player_id.clone(), round_id.clone(), profit);
        self.settle_round(&settlement).await
    }

    /// Players ranked by summed profit inside `window`, as seen at `now`.
    pub async fn leaderboard(
        &self,
        window: LeaderboardWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let since = window_start(window, now);
        self.with_retry("leaderboard", || {
            self.store
                .sum_profit_by_player(since, self.config.leaderboard_limit)
        })
        .await
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts.
    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let policy = self.config.retry;
        let mut attempt = 1;
        loop {
            match f().await {
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    let wait = policy.backoff(attempt);
                    tracing::warn!(op, attempt, ?wait, error = %e, "ledger call failed, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    tracing::error!(op, attempt, error = %e, "ledger call failed, giving up");
                    return Err(e);
                }
                ok => return ok,
            }
        }
    }
}
