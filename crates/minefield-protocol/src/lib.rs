//! Wire protocol for Minefield.
//!
//! This crate defines the vocabulary every other layer shares:
//!
//! - **Identity and money** ([`PlayerId`], [`RoundId`], [`Amount`]):
//!   small newtypes that keep ids and minor-unit balances from being
//!   mixed up with plain strings and integers.
//! - **Game views** ([`RoundStatus`], [`RevealOutcome`], [`RoundSnapshot`],
//!   [`LeaderboardEntry`], ...): what a client is allowed to see about a
//!   round or the leaderboard.
//! - **Envelopes** ([`Envelope`], [`Payload`], [`SystemMessage`],
//!   [`ClientRequest`], [`ServerResponse`]): the messages that travel on
//!   the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, messages out.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Service (rounds + ledger)
//! ```

mod codec;
mod error;
mod game;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use game::{
    CellView, ClientRequest, LeaderboardEntry, LeaderboardWindow,
    RevealOutcome, RoundSnapshot, RoundStatus, ServerResponse,
    SettlementView,
};
pub use types::{Amount, Envelope, Payload, PlayerId, RoundId, SystemMessage};
