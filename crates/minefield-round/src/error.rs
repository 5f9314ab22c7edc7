//! Error types for the round engine.

use minefield_protocol::RoundId;

/// Validation failures from the round engine.
///
/// None of these change state: the caller rejects the request and moves
/// on, there is nothing to retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// Bad grid, mine, stake, or curve parameters. Raised before any
    /// round exists.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The reveal target is outside the board.
    #[error("cell {cell} is out of range (board has {cells} cells)")]
    InvalidCell { cell: usize, cells: usize },

    /// Reveal or cashout on a round that is already won or lost.
    #[error("round {0} is not active")]
    RoundNotActive(RoundId),
}
