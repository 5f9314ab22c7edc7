//! # Minefield
//!
//! Server-authoritative backend for a Mines wagering game.
//!
//! A player stakes an amount on a grid hiding a fixed number of mines,
//! opens cells one at a time while a payout multiplier grows, and either
//! cashes out or hits a mine. Every finished round is settled exactly once
//! into the player's balance and the game log, which feeds daily and
//! weekly leaderboards.
//!
//! ## Layers
//!
//! ```text
//! WebSocket (transport) → Envelope (protocol) → MinefieldService
//!                                                 ├─ RoundEngine (minefield-round)
//!                                                 └─ LedgerService (minefield-ledger)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minefield::prelude::*;
//!
//! # async fn run() -> Result<(), MinefieldError> {
//! let server = MinefieldServerBuilder::new()
//!     .bind("127.0.0.1:8080")
//!     .build(MemoryStore::new(), UsernameAuthenticator)
//!     .await?;
//! server.run().await
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod service;
pub mod transport;

pub use auth::{Authenticator, UsernameAuthenticator};
pub use config::ServerConfig;
pub use error::MinefieldError;
pub use server::{MinefieldServer, MinefieldServerBuilder, PROTOCOL_VERSION};
pub use service::{MinefieldService, RevealReport, SettlementReport};

pub mod prelude {
    //! Everything needed to run a server or talk to one.

    pub use crate::{
        Authenticator, MinefieldError, MinefieldServer, MinefieldServerBuilder,
        MinefieldService, PROTOCOL_VERSION, RevealReport, ServerConfig, SettlementReport,
        UsernameAuthenticator,
    };
    pub use minefield_ledger::{
        GameRecord, LedgerConfig, LedgerError, LedgerService, LedgerStore, MemoryStore,
        RetryPolicy, Settlement,
    };
    pub use minefield_protocol::{
        Amount, CellView, ClientRequest, Codec, Envelope, JsonCodec, LeaderboardEntry,
        LeaderboardWindow, Payload, PlayerId, RevealOutcome, RoundId, RoundSnapshot,
        RoundStatus, ServerResponse, SettlementView, SystemMessage,
    };
    pub use minefield_round::{EngineConfig, MultiplierCurve, RoundEngine, RoundError};
}
