//! The round engine: validates parameters and deals new rounds.

use minefield_protocol::{Amount, RoundId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Board, EngineConfig, Round, RoundError};

/// Creates rounds.
///
/// The engine owns the single random source used for mine placement. It is
/// generic over that source so tests can pin a layout:
///
/// ```rust
/// use minefield_protocol::Amount;
/// use minefield_round::{EngineConfig, RoundEngine};
///
/// let mut a = RoundEngine::with_seed(EngineConfig::default(), 7).unwrap();
/// let mut b = RoundEngine::with_seed(EngineConfig::default(), 7).unwrap();
///
/// let ra = a.create_round(5, 5, 7, Amount::from_units(20)).unwrap();
/// let rb = b.create_round(5, 5, 7, Amount::from_units(20)).unwrap();
/// assert_eq!(ra.board().mine_positions(), rb.board().mine_positions());
/// ```
///
/// Round ids do not come from this source: they are always drawn from the
/// thread RNG so two seeded engines never hand out the same id.
pub struct RoundEngine<R = StdRng> {
    config: EngineConfig,
    rng: R,
}

impl RoundEngine<StdRng> {
    /// Creates an engine seeded from the operating system.
    ///
    /// # Errors
    /// [`RoundError::InvalidConfiguration`] if `config` is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, RoundError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates an engine with a fixed seed: same seed, same boards.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, RoundError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RoundEngine<R> {
    /// Creates an engine around any random source.
    pub fn with_rng(config: EngineConfig, rng: R) -> Result<Self, RoundError> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Checks round parameters without creating anything.
    ///
    /// # Errors
    /// [`RoundError::InvalidConfiguration`] when a side is outside the
    /// configured bounds, `mine_count` is zero or fills the grid, the
    /// curve would not grow on this grid, or the stake is not positive.
    pub fn validate(
        &self,
        rows: usize,
        cols: usize,
        mine_count: usize,
        stake: Amount,
    ) -> Result<(), RoundError> {
        if !self.config.side_allowed(rows) || !self.config.side_allowed(cols) {
            return Err(RoundError::InvalidConfiguration(format!(
                "grid must be between {min}x{min} and {max}x{max}, got {rows}x{cols}",
                min = self.config.min_side,
                max = self.config.max_side,
            )));
        }
        let cells = rows * cols;
        if mine_count == 0 || mine_count >= cells {
            return Err(RoundError::InvalidConfiguration(format!(
                "mine count must be between 1 and {}, got {mine_count}",
                cells - 1
            )));
        }
        self.config.curve.validate_grid(cells, mine_count)?;
        if !stake.is_positive() {
            return Err(RoundError::InvalidConfiguration(format!(
                "stake must be positive, got {stake}"
            )));
        }
        Ok(())
    }

    /// Validates the parameters and deals a fresh, active round.
    ///
    /// Mines are placed uniformly at random without replacement, before
    /// any reveal happens.
    pub fn create_round(
        &mut self,
        rows: usize,
        cols: usize,
        mine_count: usize,
        stake: Amount,
    ) -> Result<Round, RoundError> {
        self.validate(rows, cols, mine_count, stake)?;

        let board = Board::generate(rows, cols, mine_count, &mut self.rng)?;
        let id = generate_round_id();
        tracing::debug!(
            round_id = %id,
            rows,
            cols,
            mine_count,
            stake = %stake,
            "round created"
        );
        Round::new(id, board, stake, self.config.curve)
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_round_id() -> RoundId {
    let bytes: [u8; 16] = rand::rng().random();
    RoundId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
