//! In-process [`LedgerStore`].
//!
//! Each player row sits behind its own `Mutex`, so balance updates for one
//! player serialize while different players never contend. The map of rows
//! is behind an `RwLock` that is only write-locked to insert a new player.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use minefield_protocol::{Amount, LeaderboardEntry, PlayerId, RoundId};
use tokio::sync::{Mutex, RwLock};

use crate::{BalanceChange, GameRecord, LedgerError, LedgerStore, Player};

/// A player row plus the round ids already applied to it.
#[derive(Debug)]
struct Account {
    player: Player,
    /// Round id → balance right after that round was applied.
    applied: HashMap<RoundId, Amount>,
}

#[derive(Debug, Default)]
struct RecordLog {
    records: Vec<GameRecord>,
    rounds: HashSet<RoundId>,
}

/// Ledger storage held entirely in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<PlayerId, Arc<Mutex<Account>>>>,
    log: Mutex<RecordLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered players.
    pub async fn player_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// A copy of the game log, in append order.
    pub async fn records(&self) -> Vec<GameRecord> {
        self.log.lock().await.records.clone()
    }

    /// Inserts a record with an explicit timestamp. Used to seed history.
    pub async fn insert_record(&self, record: GameRecord) -> bool {
        let mut log = self.log.lock().await;
        if !log.rounds.insert(record.round_id.clone()) {
            return false;
        }
        log.records.push(record);
        true
    }

    async fn account(&self, player_id: &PlayerId) -> Option<Arc<Mutex<Account>>> {
        self.accounts.read().await.get(player_id).cloned()
    }
}

impl LedgerStore for MemoryStore {
    async fn get_or_create_player(
        &self,
        player_id: &PlayerId,
        starting_balance: Amount,
    ) -> Result<Player, LedgerError> {
        if let Some(account) = self.account(player_id).await {
            return Ok(account.lock().await.player.clone());
        }

        let account = {
            let mut accounts = self.accounts.write().await;
            // Another task may have inserted between the read and write locks.
            accounts
                .entry(player_id.clone())
                .or_insert_with(|| {
                    tracing::info!(%player_id, balance = %starting_balance, "player registered");
                    Arc::new(Mutex::new(Account {
                        player: Player {
                            id: player_id.clone(),
                            balance: starting_balance,
                            created_at: Utc::now(),
                        },
                        applied: HashMap::new(),
                    }))
                })
                .clone()
        };

        let player = account.lock().await.player.clone();
        Ok(player)
    }

    async fn get_player(&self, player_id: &PlayerId) -> Result<Option<Player>, LedgerError> {
        match self.account(player_id).await {
            Some(account) => Ok(Some(account.lock().await.player.clone())),
            None => Ok(None),
        }
    }

    async fn atomic_add_balance(
        &self,
        player_id: &PlayerId,
        round_id: &RoundId,
        delta: Amount,
    ) -> Result<BalanceChange, LedgerError> {
        let account = self
            .account(player_id)
            .await
            .ok_or_else(|| LedgerError::PlayerNotFound(player_id.clone()))?;

        let mut account = account.lock().await;
        if let Some(&balance) = account.applied.get(round_id) {
            return Ok(BalanceChange {
                balance,
                applied: false,
            });
        }

        let balance = account.player.balance.checked_add(delta).ok_or_else(|| {
            LedgerError::InvalidSettlement(format!(
                "balance overflow for {player_id} applying {delta}"
            ))
        })?;
        account.player.balance = balance;
        account.applied.insert(round_id.clone(), balance);

        Ok(BalanceChange {
            balance,
            applied: true,
        })
    }

    async fn append_game_record(&self, record: GameRecord) -> Result<bool, LedgerError> {
        Ok(self.insert_record(record).await)
    }

    async fn sum_profit_by_player(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let log = self.log.lock().await;

        let mut totals: HashMap<&PlayerId, Amount> = HashMap::new();
        for record in log.records.iter().filter(|r| r.timestamp >= since) {
            let total = totals.entry(&record.player_id).or_default();
            *total = total.checked_add(record.profit).ok_or_else(|| {
                LedgerError::InvalidSettlement(format!(
                    "profit total for {} overflows",
                    record.player_id
                ))
            })?;
        }

        let mut entries: Vec<LeaderboardEntry> = totals
            .into_iter()
            .map(|(player_id, total)| LeaderboardEntry {
                player_id: player_id.clone(),
                total,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}
