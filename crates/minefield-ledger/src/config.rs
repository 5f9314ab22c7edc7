//! Ledger configuration.

use std::time::Duration;

use minefield_protocol::Amount;
use serde::{Deserialize, Serialize};

/// Settings for a [`LedgerService`](crate::LedgerService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Balance given to a player on first registration.
    pub starting_balance: Amount,

    /// Maximum rows returned by a leaderboard query.
    pub leaderboard_limit: usize,

    /// How persistence failures are retried.
    pub retry: RetryPolicy,
}

impl LedgerConfig {
    /// 1000.00, the documented starting balance.
    pub const DEFAULT_STARTING_BALANCE: Amount = Amount::from_units(1000);

    pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: Self::DEFAULT_STARTING_BALANCE,
            leaderboard_limit: Self::DEFAULT_LEADERBOARD_LIMIT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded exponential backoff for retryable ledger errors.
///
/// The first attempt waits `initial_backoff_ms` before retrying, and every
/// later wait doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first. `1` disables retries.
    pub max_attempts: u32,

    /// Wait before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and gives up.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
        }
    }

    /// Wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}
