//! A single round and its state machine.

use minefield_protocol::{Amount, RevealOutcome, RoundId, RoundSnapshot, RoundStatus};

use crate::board::Opened;
use crate::{Board, MultiplierCurve, RoundError};

/// One play-through: a board, a stake, and a status.
///
/// ```text
/// Active ──reveal(mine)────────────→ Lost
/// Active ──reveal(last safe cell)──→ Won
/// Active ──cashout()───────────────→ Won
/// ```
///
/// Once terminal the round is frozen: [`reveal`](Self::reveal) and
/// [`cashout`](Self::cashout) return [`RoundError::RoundNotActive`] and
/// change nothing.
///
/// A round is driven by one player session at a time; it has no interior
/// locking.
#[derive(Debug, Clone)]
pub struct Round {
    id: RoundId,
    board: Board,
    stake: Amount,
    safe_revealed: usize,
    status: RoundStatus,
    curve: MultiplierCurve,
}

impl Round {
    /// Starts an active round on an existing board.
    ///
    /// # Errors
    /// [`RoundError::InvalidConfiguration`] for a non-positive stake or an
    /// invalid curve.
    pub fn new(
        id: RoundId,
        board: Board,
        stake: Amount,
        curve: MultiplierCurve,
    ) -> Result<Self, RoundError> {
        if !stake.is_positive() {
            return Err(RoundError::InvalidConfiguration(format!(
                "stake must be positive, got {stake}"
            )));
        }
        curve.validate()?;
        Ok(Self {
            id,
            board,
            stake,
            safe_revealed: 0,
            status: RoundStatus::Active,
            curve,
        })
    }

    pub fn id(&self) -> &RoundId {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn safe_revealed(&self) -> usize {
        self.safe_revealed
    }

    pub fn curve(&self) -> &MultiplierCurve {
        &self.curve
    }

    /// Multiplier at `n` safe reveals for this round's grid.
    pub fn multiplier_at(&self, n: usize) -> f64 {
        self.curve
            .multiplier(self.board.len(), self.board.mine_count(), n)
    }

    /// Multiplier a cashout would pay right now.
    pub fn multiplier(&self) -> f64 {
        self.multiplier_at(self.safe_revealed)
    }

    /// Multiplier after one more safe reveal, if any safe cell is left.
    pub fn next_multiplier(&self) -> Option<f64> {
        (self.status.is_active() && self.safe_revealed < self.board.safe_cells())
            .then(|| self.multiplier_at(self.safe_revealed + 1))
    }

    /// Opens a cell.
    ///
    /// Opening an already-open cell is a no-op that reports the current
    /// multiplier.
    ///
    /// # Errors
    /// - [`RoundError::InvalidCell`]: `cell` is off the board
    /// - [`RoundError::RoundNotActive`]: the round is already over
    pub fn reveal(&mut self, cell: usize) -> Result<RevealOutcome, RoundError> {
        if cell >= self.board.len() {
            return Err(RoundError::InvalidCell {
                cell,
                cells: self.board.len(),
            });
        }
        self.ensure_active()?;

        match self.board.open(cell) {
            Opened::AlreadyOpen => Ok(RevealOutcome::Continue {
                multiplier: self.multiplier(),
            }),
            Opened::Mine => {
                self.status = RoundStatus::Lost;
                tracing::debug!(round_id = %self.id, cell, "mine revealed, round lost");
                Ok(RevealOutcome::Lost)
            }
            Opened::Safe => {
                self.safe_revealed += 1;
                let multiplier = self.multiplier();
                if self.safe_revealed == self.board.safe_cells() {
                    self.status = RoundStatus::Won;
                    tracing::debug!(round_id = %self.id, multiplier, "board cleared, round won");
                    Ok(RevealOutcome::Won { multiplier })
                } else {
                    Ok(RevealOutcome::Continue { multiplier })
                }
            }
        }
    }

    /// Ends the round as a win at the current multiplier.
    ///
    /// Cashing out before any safe reveal pays exactly 1.0: the stake
    /// comes back with no profit.
    ///
    /// # Errors
    /// [`RoundError::RoundNotActive`] if the round is already over.
    pub fn cashout(&mut self) -> Result<RevealOutcome, RoundError> {
        self.ensure_active()?;
        self.status = RoundStatus::Won;
        let multiplier = self.multiplier();
        tracing::debug!(
            round_id = %self.id,
            safe_revealed = self.safe_revealed,
            multiplier,
            "cashed out"
        );
        Ok(RevealOutcome::Won { multiplier })
    }

    /// Signed profit of a finished round, `None` while active.
    ///
    /// `-stake` when lost, `stake × (multiplier − 1)` rounded to the
    /// nearest minor unit when won.
    pub fn profit(&self) -> Option<Amount> {
        match self.status {
            RoundStatus::Active => None,
            RoundStatus::Lost => Some(-self.stake),
            RoundStatus::Won => Some(self.stake.scale(self.multiplier() - 1.0)),
        }
    }

    /// Client-safe view. Unopened mines are hidden until the round ends.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round_id: self.id.clone(),
            rows: self.board.rows(),
            cols: self.board.cols(),
            mine_count: self.board.mine_count(),
            stake: self.stake,
            status: self.status,
            safe_revealed: self.safe_revealed,
            multiplier: self.multiplier(),
            next_multiplier: self.next_multiplier(),
            cells: self.board.views(self.status.is_terminal()),
        }
    }

    fn ensure_active(&self) -> Result<(), RoundError> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(RoundError::RoundNotActive(self.id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use minefield_protocol::CellView;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    /// 3x3 board with mines in the corners 0 and 8.
    fn round() -> Round {
        let board = Board::from_mines(3, 3, &[0, 8]).unwrap();
        Round::new(
            RoundId::new("r-test"),
            board,
            Amount::from_units(10),
            MultiplierCurve::default(),
        )
        .unwrap()
    }

    // =====================================================================
    // new()
    // =====================================================================

    #[test]
    fn test_new_starts_active_with_no_reveals() {
        let r = round();
        assert_eq!(r.status(), RoundStatus::Active);
        assert_eq!(r.safe_revealed(), 0);
        assert_eq!(r.multiplier(), 1.0);
        assert_eq!(r.profit(), None);
    }

    #[test]
    fn test_new_rejects_non_positive_stake() {
        let board = Board::from_mines(3, 3, &[0]).unwrap();
        for stake in [Amount::ZERO, Amount::from_units(-5)] {
            let result = Round::new(
                RoundId::new("r"),
                board.clone(),
                stake,
                MultiplierCurve::default(),
            );
            assert!(matches!(result, Err(RoundError::InvalidConfiguration(_))));
        }
    }

    // =====================================================================
    // reveal()
    // =====================================================================

    #[test]
    fn test_reveal_safe_cell_continues_with_next_multiplier() {
        let mut r = round();
        let expected = r.multiplier_at(1);

        let outcome = r.reveal(4).unwrap();

        assert_eq!(outcome, RevealOutcome::Continue { multiplier: expected });
        assert_eq!(r.safe_revealed(), 1);
        assert!(expected > 1.0);
    }

    #[test]
    fn test_reveal_mine_loses_regardless_of_progress() {
        let mut r = round();
        r.reveal(1).unwrap();
        r.reveal(2).unwrap();
        r.reveal(3).unwrap();

        let outcome = r.reveal(8).unwrap();

        assert_eq!(outcome, RevealOutcome::Lost);
        assert_eq!(r.status(), RoundStatus::Lost);
        assert_eq!(r.safe_revealed(), 3);
        assert_eq!(r.profit(), Some(Amount::from_units(-10)));
    }

    #[test]
    fn test_reveal_same_cell_twice_is_noop() {
        let mut r = round();
        let first = r.reveal(4).unwrap();
        let second = r.reveal(4).unwrap();

        assert_eq!(first, second);
        assert_eq!(r.safe_revealed(), 1);
        assert_eq!(r.status(), RoundStatus::Active);
    }

    #[test]
    fn test_reveal_out_of_range_is_invalid_cell() {
        let mut r = round();
        let result = r.reveal(9);
        assert_eq!(result, Err(RoundError::InvalidCell { cell: 9, cells: 9 }));
        assert_eq!(r.safe_revealed(), 0);
    }

    #[test]
    fn test_reveal_all_safe_cells_auto_wins() {
        let mut r = round();
        let full = r.multiplier_at(7);

        let mut last = None;
        for cell in 1..=7 {
            last = Some(r.reveal(cell).unwrap());
        }

        assert_eq!(last, Some(RevealOutcome::Won { multiplier: full }));
        assert_eq!(r.status(), RoundStatus::Won);
        assert_eq!(r.next_multiplier(), None);
        assert_eq!(r.profit(), Some(Amount::from_units(10).scale(full - 1.0)));
    }

    #[test]
    fn test_reveal_after_terminal_is_rejected_without_mutation() {
        let mut r = round();
        r.reveal(4).unwrap();
        r.reveal(0).unwrap(); // mine

        for cell in [1, 4, 8] {
            let result = r.reveal(cell);
            assert!(matches!(result, Err(RoundError::RoundNotActive(_))));
        }
        assert_eq!(r.safe_revealed(), 1);
        assert_eq!(r.status(), RoundStatus::Lost);
        assert!(!r.board().cell(1).unwrap().is_revealed);
    }

    #[test]
    fn test_reveal_out_of_range_checked_before_status() {
        let mut r = round();
        r.cashout().unwrap();
        assert!(matches!(r.reveal(99), Err(RoundError::InvalidCell { .. })));
    }

    // =====================================================================
    // cashout()
    // =====================================================================

    #[test]
    fn test_cashout_without_reveals_returns_stake_only() {
        let mut r = round();
        let outcome = r.cashout().unwrap();

        assert_eq!(outcome, RevealOutcome::Won { multiplier: 1.0 });
        assert_eq!(r.profit(), Some(Amount::ZERO));
    }

    #[test]
    fn test_cashout_pays_current_multiplier() {
        let mut r = round();
        r.reveal(1).unwrap();
        r.reveal(2).unwrap();
        let m = r.multiplier_at(2);

        assert_eq!(r.cashout().unwrap(), RevealOutcome::Won { multiplier: m });
        assert_eq!(r.profit(), Some(Amount::from_units(10).scale(m - 1.0)));
    }

    #[test]
    fn test_cashout_twice_is_rejected() {
        let mut r = round();
        r.cashout().unwrap();
        assert!(matches!(r.cashout(), Err(RoundError::RoundNotActive(_))));
        assert_eq!(r.status(), RoundStatus::Won);
    }

    #[test]
    fn test_cashout_after_loss_is_rejected() {
        let mut r = round();
        r.reveal(0).unwrap();
        assert!(matches!(r.cashout(), Err(RoundError::RoundNotActive(_))));
        assert_eq!(r.status(), RoundStatus::Lost);
    }

    // =====================================================================
    // snapshot()
    // =====================================================================

    #[test]
    fn test_snapshot_hides_mines_while_active() {
        let mut r = round();
        r.reveal(4).unwrap();
        let snap = r.snapshot();

        assert_eq!(snap.status, RoundStatus::Active);
        assert_eq!(snap.cells[0], CellView::Hidden);
        assert_eq!(snap.cells[4], CellView::Safe);
        assert_eq!(snap.next_multiplier, Some(r.multiplier_at(2)));
    }

    #[test]
    fn test_snapshot_shows_mines_after_loss() {
        let mut r = round();
        r.reveal(0).unwrap();
        let snap = r.snapshot();

        assert_eq!(snap.status, RoundStatus::Lost);
        assert_eq!(snap.cells[0], CellView::Mine);
        assert_eq!(snap.cells[8], CellView::Mine);
        assert_eq!(snap.next_multiplier, None);
    }
}
