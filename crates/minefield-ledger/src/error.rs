//! Error types for the ledger.

use minefield_protocol::PlayerId;

/// Errors raised while registering, settling, or aggregating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Storage could not be reached. Retryable: every store operation is
    /// idempotent, so the caller may repeat it with the same settlement.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// The player has never registered. Settlements never create players.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The settlement itself is malformed (e.g. a loss with a positive
    /// profit, or a balance that would overflow).
    #[error("invalid settlement: {0}")]
    InvalidSettlement(String),
}

impl LedgerError {
    /// Returns `true` if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceUnavailable(_))
    }
}
