//! Ledger records: players, settlements, and the immutable game log.

use chrono::{DateTime, Utc};
use minefield_protocol::{Amount, PlayerId, RoundId, SettlementView};
use serde::{Deserialize, Serialize};

/// A registered player and their balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

/// One line of the append-only game log. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub profit: Amount,
    pub timestamp: DateTime<Utc>,
}

/// The monetary consequence of one terminated round.
///
/// `round_id` is the idempotence key: settling the same `Settlement`
/// twice has the same effect as settling it once. Keep the value around
/// until [`LedgerService::settle_round`](crate::LedgerService::settle_round)
/// succeeds so a failed settlement can be retried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub round_id: RoundId,
    pub player_id: PlayerId,
    /// Signed: negative on loss, positive on win, zero on break-even.
    pub profit: Amount,
    /// When the round ended. Becomes the record's timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Settlement {
    /// A settlement stamped with the current time.
    pub fn new(player_id: PlayerId, round_id: RoundId, profit: Amount) -> Self {
        Self {
            round_id,
            player_id,
            profit,
            timestamp: Utc::now(),
        }
    }

    /// The log line this settlement appends.
    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            round_id: self.round_id.clone(),
            player_id: self.player_id.clone(),
            profit: self.profit,
            timestamp: self.timestamp,
        }
    }
}

/// Confirmation that a settlement is durable: balance applied and record
/// appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub profit: Amount,
    /// Balance right after this round's change was applied.
    pub balance: Amount,
    /// `true` if the balance change had already been applied by an
    /// earlier attempt and this call only confirmed it.
    pub replayed: bool,
}

impl From<SettlementReceipt> for SettlementView {
    fn from(receipt: SettlementReceipt) -> Self {
        Self {
            round_id: receipt.round_id,
            profit: receipt.profit,
            balance: receipt.balance,
        }
    }
}
