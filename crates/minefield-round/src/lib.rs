//! Round engine for Minefield.
//!
//! Pure game logic: no I/O, no persistence, no locks. A [`RoundEngine`]
//! validates parameters and deals boards from a seedable random source; a
//! [`Round`] is then driven by [`Round::reveal`] and [`Round::cashout`]
//! until it reaches a terminal [`RoundStatus`].
//!
//! # Key types
//!
//! - [`RoundEngine`]: validates and creates rounds
//! - [`Round`]: one play-through and its state machine
//! - [`Board`]: the mine layout and which cells are open
//! - [`MultiplierCurve`]: the tunable payout schedule
//! - [`EngineConfig`]: grid bounds and curve parameters

mod board;
mod config;
mod engine;
mod error;
mod round;
mod schedule;

pub use board::{Board, Cell};
pub use config::EngineConfig;
pub use engine::RoundEngine;
pub use error::RoundError;
pub use round::Round;
pub use schedule::MultiplierCurve;

pub use minefield_protocol::{RevealOutcome, RoundStatus};
