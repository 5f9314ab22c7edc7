//! Unified error type for Minefield.

use minefield_ledger::LedgerError;
use minefield_protocol::{Amount, ProtocolError};
use minefield_round::RoundError;

use crate::transport::TransportError;

/// Top-level error that wraps every crate-specific error plus the
/// service-level conflicts that only make sense once rounds and the
/// ledger meet.
///
/// The `#[from]` attribute on each wrapping variant auto-generates `From`
/// impls, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MinefieldError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A round-level error (bad parameters, bad cell, finished round).
    #[error(transparent)]
    Round(#[from] RoundError),

    /// A ledger-level error (storage down, unknown player).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Reveal or cashout with no round on the table.
    #[error("no active round")]
    NoActiveRound,

    /// Resettle with nothing pending.
    #[error("no pending settlement")]
    NoPendingSettlement,

    /// A new round was requested while one is still being played.
    #[error("a round is already in progress")]
    RoundInProgress,

    /// The last round ended but its settlement has not gone through yet.
    #[error("previous round is awaiting settlement, resettle first")]
    SettlementPending,

    /// The stake exceeds the player's balance.
    #[error("insufficient balance: stake {stake}, balance {balance}")]
    InsufficientBalance { stake: Amount, balance: Amount },

    /// The handshake token was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl MinefieldError {
    /// HTTP-style status code sent in a wire `Error` message.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Transport(_) => 500,
            Self::Protocol(_) => 400,
            Self::Round(RoundError::RoundNotActive(_)) => 409,
            Self::Round(_) => 400,
            Self::Ledger(LedgerError::PersistenceUnavailable(_)) => 503,
            Self::Ledger(LedgerError::PlayerNotFound(_)) => 404,
            Self::Ledger(LedgerError::InvalidSettlement(_)) => 400,
            Self::NoActiveRound | Self::NoPendingSettlement => 404,
            Self::RoundInProgress | Self::SettlementPending => 409,
            Self::InsufficientBalance { .. } => 402,
            Self::Unauthorized(_) => 401,
        }
    }
}
