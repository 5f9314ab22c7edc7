//! Balance ledger for Minefield.
//!
//! The ledger is the only place money moves. It turns a finished round
//! into exactly one balance change and exactly one [`GameRecord`], even
//! when settlements race or get retried.
//!
//! 1. **Persistence**: the [`LedgerStore`] trait; [`MemoryStore`] is the
//!    in-process implementation
//! 2. **Settlement**: [`LedgerService`] applies a [`Settlement`] with
//!    retries, keyed by round id so a retry never double-applies
//! 3. **Leaderboard**: ranked profit sums over a day or a week
//!
//! # How it fits in the stack
//!
//! ```text
//! Service layer (above)  ← hands over terminal rounds as Settlements
//!     ↕
//! Ledger (this crate)    ← balances, records, leaderboard
//!     ↕
//! LedgerStore            ← per-player atomic balance updates
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod memory;
mod service;
mod store;
mod types;

pub use config::{LedgerConfig, RetryPolicy};
pub use error::LedgerError;
pub use memory::MemoryStore;
pub use service::{LedgerService, window_start};
pub use store::{BalanceChange, LedgerStore};
pub use types::{GameRecord, Player, Settlement, SettlementReceipt};
