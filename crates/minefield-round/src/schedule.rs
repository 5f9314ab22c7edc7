//! The multiplier schedule: how much a cashout pays after `n` safe reveals.
//!
//! # The curve
//!
//! With `T` cells and `M` mines, the chance of surviving `n` safe reveals
//! is `Π_{i<n} (T−M−i)/(T−i)`. Its inverse is the *fair* multiplier:
//!
//! ```text
//! fair(n) = Π_{i<n} (T − i) / (T − M − i)
//! ```
//!
//! A game paying `fair(n)` has zero expected profit for both sides. The
//! paid multiplier keeps the stake intact and scales only the profit part:
//!
//! ```text
//! multiplier(n) = 1 + (fair(n) − 1) · (1 − house_edge) · growth
//! ```
//!
//! so `multiplier(0) == 1.0` exactly, and every safe reveal strictly
//! increases it (each factor of `fair` is `> 1` when `M ≥ 1`). With
//! `growth = 1` the expected return of cashing out after `n` reveals is
//! `1 − house_edge · (1 − 1/fair(n))`, which approaches `1 − house_edge`
//! as the board is cleared.

use serde::{Deserialize, Serialize};

use crate::RoundError;

/// Tunable payout curve.
///
/// Both parameters are explicit so operators can tune the game without
/// touching reveal logic:
///
/// - `house_edge`: fraction of the fair profit the house keeps, `[0, 1)`.
/// - `growth`: scales how fast the payout climbs, `> 0`. Values above
///   `1 / (1 − house_edge)` pay more than fair odds.
///
/// The curve is deterministic: the same inputs always produce the same
/// `f64`, bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplierCurve {
    pub house_edge: f64,
    pub growth: f64,
}

impl Default for MultiplierCurve {
    fn default() -> Self {
        Self {
            house_edge: Self::DEFAULT_HOUSE_EDGE,
            growth: 1.0,
        }
    }
}

impl MultiplierCurve {
    /// One percent.
    pub const DEFAULT_HOUSE_EDGE: f64 = 0.01;

    /// Smallest accepted `(1 − house_edge) · growth`. Below it a safe
    /// reveal can round away to a multiplier of exactly `1.0`.
    pub const MIN_PROFIT_SCALE: f64 = 1e-6;

    /// Builds a validated curve.
    ///
    /// # Errors
    /// [`RoundError::InvalidConfiguration`] when `house_edge` is outside
    /// `[0, 1)`, `growth` is not a positive finite number, or together
    /// they scale profit below [`Self::MIN_PROFIT_SCALE`].
    pub fn new(house_edge: f64, growth: f64) -> Result<Self, RoundError> {
        let curve = Self { house_edge, growth };
        curve.validate()?;
        Ok(curve)
    }

    /// Checks the parameters keep the curve strictly increasing.
    pub fn validate(&self) -> Result<(), RoundError> {
        if !(self.house_edge.is_finite() && (0.0..1.0).contains(&self.house_edge)) {
            return Err(RoundError::InvalidConfiguration(format!(
                "house edge must be in [0, 1), got {}",
                self.house_edge
            )));
        }
        if !(self.growth.is_finite() && self.growth > 0.0) {
            return Err(RoundError::InvalidConfiguration(format!(
                "growth must be positive, got {}",
                self.growth
            )));
        }
        let scale = self.profit_scale();
        if !(scale.is_finite() && scale >= Self::MIN_PROFIT_SCALE) {
            return Err(RoundError::InvalidConfiguration(format!(
                "(1 - house_edge) * growth must be at least {}, got {scale}",
                Self::MIN_PROFIT_SCALE
            )));
        }
        Ok(())
    }

    /// Checks every safe reveal on a `total_cells` / `mine_count` grid
    /// pays strictly more than the one before.
    pub fn validate_grid(&self, total_cells: usize, mine_count: usize) -> Result<(), RoundError> {
        let safe_cells = total_cells.saturating_sub(mine_count);
        let mut previous = self.multiplier(total_cells, mine_count, 0);
        for n in 1..=safe_cells {
            let next = self.multiplier(total_cells, mine_count, n);
            if !(next.is_finite() && next > previous) {
                return Err(RoundError::InvalidConfiguration(format!(
                    "multiplier does not increase at reveal {n} of a {total_cells}-cell grid with {mine_count} mines"
                )));
            }
            previous = next;
        }
        Ok(())
    }

    fn profit_scale(&self) -> f64 {
        (1.0 - self.house_edge) * self.growth
    }

    /// Inverse survival probability after `safe_revealed` safe reveals.
    ///
    /// `safe_revealed` is clamped to the number of safe cells. Requires
    /// `mine_count < total_cells`.
    pub fn fair_odds(total_cells: usize, mine_count: usize, safe_revealed: usize) -> f64 {
        let safe_cells = total_cells.saturating_sub(mine_count);
        let n = safe_revealed.min(safe_cells);
        (0..n).fold(1.0, |odds, i| {
            odds * (total_cells - i) as f64 / (safe_cells - i) as f64
        })
    }

    /// The payout multiplier after `safe_revealed` safe reveals.
    ///
    /// Total over `0 ..= total_cells − mine_count`; larger counts are
    /// clamped to a full clear.
    pub fn multiplier(&self, total_cells: usize, mine_count: usize, safe_revealed: usize) -> f64 {
        let fair = Self::fair_odds(total_cells, mine_count, safe_revealed);
        1.0 + (fair - 1.0) * self.profit_scale()
    }

    /// Expected return per unit staked when a player commits to cashing
    /// out after exactly `safe_revealed` safe reveals.
    pub fn expected_return(
        &self,
        total_cells: usize,
        mine_count: usize,
        safe_revealed: usize,
    ) -> f64 {
        let survive = 1.0 / Self::fair_odds(total_cells, mine_count, safe_revealed);
        survive * self.multiplier(total_cells, mine_count, safe_revealed)
    }
}
