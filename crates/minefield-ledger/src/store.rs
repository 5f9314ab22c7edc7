//! The persistence seam.
//!
//! The ledger never talks to a database directly. It goes through
//! [`LedgerStore`], a handful of async methods that a Postgres pool, a
//! key-value store, or the bundled [`MemoryStore`](crate::MemoryStore)
//! can implement.
//!
//! # Contract
//!
//! - Every method may fail with
//!   [`LedgerError::PersistenceUnavailable`](crate::LedgerError::PersistenceUnavailable),
//!   and every method is safe to call again after such a failure.
//! - `atomic_add_balance` is a single read-modify-write per player,
//!   serialized per player id. It is keyed by round id: a second call for
//!   a round that was already applied changes nothing.
//! - `append_game_record` is keyed by round id as well.

use chrono::{DateTime, Utc};
use minefield_protocol::{Amount, LeaderboardEntry, PlayerId, RoundId};

use crate::{GameRecord, LedgerError, Player};

/// Result of [`LedgerStore::atomic_add_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    /// Balance right after this round's delta was applied. For a replay
    /// this is the balance recorded when it was first applied.
    pub balance: Amount,
    /// `false` if the round had already been applied.
    pub applied: bool,
}

/// Durable storage for players, balances, and game records.
///
/// `Send + Sync + 'static` because one store is shared by every
/// connection task for the lifetime of the server.
pub trait LedgerStore: Send + Sync + 'static {
    /// Returns the player, creating it with `starting_balance` if absent.
    ///
    /// Concurrent first-contact calls for the same id create one row:
    /// the first writer wins and everyone else reads it back.
    fn get_or_create_player(
        &self,
        player_id: &PlayerId,
        starting_balance: Amount,
    ) -> impl Future<Output = Result<Player, LedgerError>> + Send;

    /// Looks a player up without creating it.
    fn get_player(
        &self,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<Option<Player>, LedgerError>> + Send;

    /// Adds `delta` to the player's balance, once per `round_id`.
    ///
    /// # Errors
    /// - `PlayerNotFound` if the player never registered
    /// - `InvalidSettlement` if the balance would overflow
    fn atomic_add_balance(
        &self,
        player_id: &PlayerId,
        round_id: &RoundId,
        delta: Amount,
    ) -> impl Future<Output = Result<BalanceChange, LedgerError>> + Send;

    /// Appends a record. Returns `false` if a record for the same round
    /// already exists (nothing is written).
    fn append_game_record(
        &self,
        record: GameRecord,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Sums profit per player over records at or after `since`, sorted by
    /// total descending (ties by player id), at most `limit` rows.
    fn sum_profit_by_player(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, LedgerError>> + Send;
}
