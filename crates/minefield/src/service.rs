//! `MinefieldService`: rounds and the ledger behind one transport-free API.
//!
//! Each player has a *table* holding their current (or last) round and, if
//! the last settlement failed, the [`Settlement`] still owed to the ledger.
//! A table is created by a registered player's first
//! [`MinefieldService::start_round`]; every other operation only looks it
//! up. The last
//! round stays on the table so a repeat cashout or reveal still reports
//! `RoundNotActive`.
//! Every operation on a player locks that player's table for its whole
//! duration, settlement included, so one player's requests run strictly in
//! order while different players never wait on each other.
//!
//! # Settlement
//!
//! When a reveal or cashout ends the round, the service builds the
//! settlement, parks it on the table, and hands it to the ledger. Only when
//! the ledger confirms it is the settlement cleared and reported back. If
//! the ledger fails, the round stays finished, the settlement stays parked,
//! the caller gets the error, and [`MinefieldService::resettle`] retries
//! with the same round id.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use minefield_ledger::{LedgerService, LedgerStore, Settlement};
use minefield_protocol::{
    Amount, LeaderboardEntry, LeaderboardWindow, PlayerId, RevealOutcome, RoundSnapshot,
    SettlementView,
};
use minefield_round::{Round, RoundEngine};
use tokio::sync::Mutex;

use crate::{MinefieldError, ServerConfig};

/// Result of a reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealReport {
    pub cell: usize,
    pub outcome: RevealOutcome,
    pub round: RoundSnapshot,
    /// Present exactly when the reveal ended the round.
    pub settlement: Option<SettlementView>,
}

/// Result of a cashout.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReport {
    pub outcome: RevealOutcome,
    pub round: RoundSnapshot,
    pub settlement: SettlementView,
}

#[derive(Debug, Default)]
struct Table {
    round: Option<Round>,
    pending: Option<Settlement>,
}

/// Drives rounds for many players and settles them through the ledger.
pub struct MinefieldService<S> {
    engine: Mutex<RoundEngine>,
    ledger: LedgerService<S>,
    tables: Mutex<HashMap<PlayerId, Arc<Mutex<Table>>>>,
}

impl<S: LedgerStore> MinefieldService<S> {
    pub fn new(engine: RoundEngine, ledger: LedgerService<S>) -> Self {
        Self {
            engine: Mutex::new(engine),
            ledger,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the engine and ledger from a [`ServerConfig`].
    pub fn from_config(config: &ServerConfig, store: S) -> Result<Self, MinefieldError> {
        let engine = RoundEngine::new(config.engine.clone())?;
        Ok(Self::new(engine, LedgerService::new(store, config.ledger.clone())))
    }

    pub fn ledger(&self) -> &LedgerService<S> {
        &self.ledger
    }

    /// Registers the player if needed and returns their balance.
    pub async fn register(&self, player_id: &PlayerId) -> Result<Amount, MinefieldError> {
        Ok(self.ledger.register(player_id).await?.balance)
    }

    pub async fn balance(&self, player_id: &PlayerId) -> Result<Amount, MinefieldError> {
        Ok(self.ledger.balance(player_id).await?)
    }

    /// Deals a new round.
    ///
    /// # Errors
    /// - `Round(InvalidConfiguration)` for bad grid, mine count, or stake
    /// - `RoundInProgress` if the current round is still active
    /// - `SettlementPending` if the last round has not been settled
    /// - `Ledger(PlayerNotFound)` if the player never registered
    /// - `InsufficientBalance` if `stake` exceeds the balance
    pub async fn start_round(
        &self,
        player_id: &PlayerId,
        rows: usize,
        cols: usize,
        mines: usize,
        stake: Amount,
    ) -> Result<RoundSnapshot, MinefieldError> {
        let table = match self.existing_table(player_id).await {
            Some(table) => table,
            None => {
                // Only registered players get a table.
                self.ledger.balance(player_id).await?;
                self.table(player_id).await
            }
        };
        let mut table = table.lock().await;

        if table.round.as_ref().is_some_and(|r| r.status().is_active()) {
            return Err(MinefieldError::RoundInProgress);
        }
        if table.pending.is_some() {
            return Err(MinefieldError::SettlementPending);
        }

        self.engine.lock().await.validate(rows, cols, mines, stake)?;

        let balance = self.ledger.balance(player_id).await?;
        if stake > balance {
            return Err(MinefieldError::InsufficientBalance { stake, balance });
        }

        let round = self
            .engine
            .lock()
            .await
            .create_round(rows, cols, mines, stake)?;
        tracing::info!(
            %player_id,
            round_id = %round.id(),
            rows,
            cols,
            mines,
            %stake,
            "round started"
        );

        let snapshot = round.snapshot();
        table.round = Some(round);
        Ok(snapshot)
    }

    /// Opens one cell. A mine or the last safe cell ends the round, which is
    /// settled before this returns.
    pub async fn reveal(
        &self,
        player_id: &PlayerId,
        cell: usize,
    ) -> Result<RevealReport, MinefieldError> {
        let table = self
            .existing_table(player_id)
            .await
            .ok_or(MinefieldError::NoActiveRound)?;
        let mut table = table.lock().await;

        let round = table.round.as_mut().ok_or(MinefieldError::NoActiveRound)?;
        let outcome = round.reveal(cell)?;
        let snapshot = round.snapshot();

        let settlement = if outcome.is_terminal() {
            Some(self.settle(player_id, &mut table).await?)
        } else {
            None
        };

        Ok(RevealReport {
            cell,
            outcome,
            round: snapshot,
            settlement,
        })
    }

    /// Ends the round at the current multiplier and settles it.
    pub async fn cashout(&self, player_id: &PlayerId) -> Result<SettlementReport, MinefieldError> {
        let table = self
            .existing_table(player_id)
            .await
            .ok_or(MinefieldError::NoActiveRound)?;
        let mut table = table.lock().await;

        let round = table.round.as_mut().ok_or(MinefieldError::NoActiveRound)?;
        let outcome = round.cashout()?;
        let snapshot = round.snapshot();
        let settlement = self.settle(player_id, &mut table).await?;

        Ok(SettlementReport {
            outcome,
            round: snapshot,
            settlement,
        })
    }

    /// Retries the settlement left over from a failed reveal or cashout.
    pub async fn resettle(&self, player_id: &PlayerId) -> Result<SettlementView, MinefieldError> {
        let table = self
            .existing_table(player_id)
            .await
            .ok_or(MinefieldError::NoPendingSettlement)?;
        let mut table = table.lock().await;

        if table.pending.is_none() {
            return Err(MinefieldError::NoPendingSettlement);
        }
        self.settle(player_id, &mut table).await
    }

    /// The current round, or the last one if it has ended.
    pub async fn round(&self, player_id: &PlayerId) -> Option<RoundSnapshot> {
        let table = self.existing_table(player_id).await?;
        let table = table.lock().await;
        table.round.as_ref().map(Round::snapshot)
    }

    /// Whether the player has a settlement waiting for [`resettle`](Self::resettle).
    pub async fn has_pending_settlement(&self, player_id: &PlayerId) -> bool {
        match self.existing_table(player_id).await {
            Some(table) => table.lock().await.pending.is_some(),
            None => false,
        }
    }

    /// Number of players holding a table.
    pub async fn table_count(&self) -> usize {
        self.tables.lock().await.len()
    }

    pub async fn leaderboard(
        &self,
        window: LeaderboardWindow,
    ) -> Result<Vec<LeaderboardEntry>, MinefieldError> {
        Ok(self.ledger.leaderboard(window, Utc::now()).await?)
    }

    /// Settles the table's finished round, parking the settlement first so
    /// a failure leaves it retryable.
    async fn settle(
        &self,
        player_id: &PlayerId,
        table: &mut Table,
    ) -> Result<SettlementView, MinefieldError> {
        if table.pending.is_none() {
            let round = table.round.as_ref().ok_or(MinefieldError::NoActiveRound)?;
            let profit = round.profit().ok_or(MinefieldError::RoundInProgress)?;
            tracing::info!(
                %player_id,
                round_id = %round.id(),
                status = %round.status(),
                %profit,
                "round finished"
            );
            table.pending = Some(Settlement::new(player_id.clone(), round.id().clone(), profit));
        }

        let Some(settlement) = table.pending.as_ref() else {
            return Err(MinefieldError::NoPendingSettlement);
        };
        match self.ledger.settle_round(settlement).await {
            Ok(receipt) => {
                table.pending = None;
                Ok(receipt.into())
            }
            Err(e) => {
                tracing::warn!(
                    %player_id,
                    round_id = %settlement.round_id,
                    error = %e,
                    "settlement failed, kept pending"
                );
                Err(e.into())
            }
        }
    }

    /// The player's table, created empty on first use.
    async fn table(&self, player_id: &PlayerId) -> Arc<Mutex<Table>> {
        let mut tables = self.tables.lock().await;
        Arc::clone(tables.entry(player_id.clone()).or_default())
    }

    async fn existing_table(&self, player_id: &PlayerId) -> Option<Arc<Mutex<Table>>> {
        self.tables.lock().await.get(player_id).cloned()
    }
}
