//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::{MultiplierCurve, RoundError};

/// Settings for a [`RoundEngine`](crate::RoundEngine).
///
/// Side lengths are bounded to a small range (3..=5 by default, matching
/// the grids the client offers). Missing fields fall back to the defaults
/// when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smallest allowed row or column count.
    pub min_side: usize,

    /// Largest allowed row or column count.
    pub max_side: usize,

    /// Payout curve applied to every round this engine creates.
    pub curve: MultiplierCurve,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_side: 3,
            max_side: 5,
            curve: MultiplierCurve::default(),
        }
    }
}

impl EngineConfig {
    /// Checks the bounds are usable and the curve is valid.
    pub fn validate(&self) -> Result<(), RoundError> {
        if self.min_side == 0 || self.min_side > self.max_side {
            return Err(RoundError::InvalidConfiguration(format!(
                "side bounds must satisfy 1 <= min <= max, got {}..={}",
                self.min_side, self.max_side
            )));
        }
        // A 1x1 grid has no room for a mine and a safe cell.
        if self.max_side * self.max_side < 2 {
            return Err(RoundError::InvalidConfiguration(
                "largest grid must have at least two cells".into(),
            ));
        }
        self.curve.validate()
    }

    /// Returns `true` if `side` is an allowed row or column count.
    pub fn side_allowed(&self, side: usize) -> bool {
        (self.min_side..=self.max_side).contains(&side)
    }
}
