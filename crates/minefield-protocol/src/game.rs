//! Game-facing wire types: round views, reveal outcomes, leaderboard rows,
//! and the request/response pairs a client drives a round with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, PlayerId, RoundId};

// ---------------------------------------------------------------------------
// RoundStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a round.
///
/// ```text
///            ┌──→ Lost   (mine revealed)
/// Active ────┤
///            └──→ Won    (all safe cells opened, or cashout)
/// ```
///
/// Both `Won` and `Lost` are terminal. Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundStatus {
    Active,
    Won,
    Lost,
}

impl RoundStatus {
    /// Returns `true` while reveals and cashout are still allowed.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` once the round has an outcome.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Won => write!(f, "Won"),
            Self::Lost => write!(f, "Lost"),
        }
    }
}

// ---------------------------------------------------------------------------
// RevealOutcome
// ---------------------------------------------------------------------------

/// Result of a reveal or a cashout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum RevealOutcome {
    /// Safe cell, round still active. `multiplier` is what a cashout
    /// would pay right now.
    Continue { multiplier: f64 },
    /// Round won, either by clearing every safe cell or by cashing out.
    Won { multiplier: f64 },
    /// A mine. No multiplier is computed for a lost round.
    Lost,
}

impl RevealOutcome {
    /// The multiplier carried by the outcome, if any.
    pub fn multiplier(&self) -> Option<f64> {
        match self {
            Self::Continue { multiplier } | Self::Won { multiplier } => Some(*multiplier),
            Self::Lost => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue { .. })
    }
}

// ---------------------------------------------------------------------------
// Round snapshots
// ---------------------------------------------------------------------------

/// What a client may know about one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellView {
    /// Unopened. Mines stay hidden while the round is active.
    Hidden,
    /// Opened, no mine.
    Safe,
    /// A mine: the one that ended the round, or any mine once the round
    /// is over.
    Mine,
}

/// A client-safe view of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    pub rows: usize,
    pub cols: usize,
    pub mine_count: usize,
    pub stake: Amount,
    pub status: RoundStatus,
    pub safe_revealed: usize,
    /// Multiplier at the current safe-reveal count.
    pub multiplier: f64,
    /// Multiplier after one more safe reveal, `None` when there is none.
    pub next_multiplier: Option<f64>,
    /// Row-major, `rows * cols` entries.
    pub cells: Vec<CellView>,
}

/// The monetary result of a settled round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementView {
    pub round_id: RoundId,
    /// Signed: `-stake` on loss, `stake × (multiplier − 1)` on win.
    pub profit: Amount,
    /// Balance after the settlement was durably applied.
    pub balance: Amount,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// Aggregation window for the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaderboardWindow {
    /// Since the start of the current UTC day.
    Day,
    /// The last seven days.
    Week,
}

impl fmt::Display for LeaderboardWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
        }
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    /// Sum of the player's profits inside the window.
    pub total: Amount,
}

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

/// Requests a connected client can make. The player is implied by the
/// connection's handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Open a new round on a `rows × cols` grid with `mines` mines.
    StartRound {
        rows: usize,
        cols: usize,
        mines: usize,
        stake: Amount,
    },
    /// Open one cell (row-major index).
    Reveal { cell: usize },
    /// Take the current multiplier and end the round.
    Cashout,
    /// Retry a settlement that failed earlier.
    Resettle,
    /// Fetch the current (or last) round.
    GetRound,
    GetBalance,
    Leaderboard { window: LeaderboardWindow },
}

/// Server answers, one per [`ClientRequest`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerResponse {
    RoundStarted {
        round: RoundSnapshot,
    },
    /// `settlement` is present exactly when the reveal ended the round.
    Revealed {
        cell: usize,
        outcome: RevealOutcome,
        round: RoundSnapshot,
        settlement: Option<SettlementView>,
    },
    CashedOut {
        outcome: RevealOutcome,
        round: RoundSnapshot,
        settlement: SettlementView,
    },
    Resettled {
        settlement: SettlementView,
    },
    Round {
        round: Option<RoundSnapshot>,
    },
    Balance {
        balance: Amount,
    },
    Leaderboard {
        window: LeaderboardWindow,
        entries: Vec<LeaderboardEntry>,
    },
}
