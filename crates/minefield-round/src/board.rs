//! The grid: mine layout plus which cells are open.

use minefield_protocol::CellView;
use rand::Rng;

use crate::RoundError;

/// One grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub is_mine: bool,
    pub is_revealed: bool,
}

/// What happened when a cell was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Opened {
    AlreadyOpen,
    Safe,
    Mine,
}

/// A `rows × cols` grid, stored row-major.
///
/// The mine layout is decided once, at construction, and never changes:
/// the only mutation a board supports is opening a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    mine_count: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Deals a board with `mine_count` mines placed uniformly at random,
    /// without replacement.
    ///
    /// # Errors
    /// [`RoundError::InvalidConfiguration`] unless
    /// `0 < mine_count < rows * cols`.
    pub fn generate<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        mine_count: usize,
        rng: &mut R,
    ) -> Result<Self, RoundError> {
        let len = check_counts(rows, cols, mine_count)?;
        let mut cells = vec![Cell::default(); len];
        for index in rand::seq::index::sample(rng, len, mine_count) {
            cells[index].is_mine = true;
        }
        Ok(Self {
            rows,
            cols,
            mine_count,
            cells,
        })
    }

    /// Builds a board with mines at exactly the given cells.
    ///
    /// Useful for replaying a known layout.
    ///
    /// # Errors
    /// [`RoundError::InvalidConfiguration`] for an empty grid, no mines,
    /// mines covering every cell, duplicates, or out-of-range indices.
    pub fn from_mines(rows: usize, cols: usize, mines: &[usize]) -> Result<Self, RoundError> {
        let len = check_counts(rows, cols, mines.len())?;
        let mut cells = vec![Cell::default(); len];
        for &index in mines {
            let cell = cells.get_mut(index).ok_or_else(|| {
                RoundError::InvalidConfiguration(format!(
                    "mine at cell {index} is outside a {rows}x{cols} grid"
                ))
            })?;
            if cell.is_mine {
                return Err(RoundError::InvalidConfiguration(format!(
                    "duplicate mine at cell {index}"
                )));
            }
            cell.is_mine = true;
        }
        Ok(Self {
            rows,
            cols,
            mine_count: mines.len(),
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    /// Number of cells without a mine.
    pub fn safe_cells(&self) -> usize {
        self.len() - self.mine_count
    }

    /// Row-major index of `(row, col)`, or `None` if off the grid.
    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// `false` for out-of-range indices.
    pub fn is_mine(&self, index: usize) -> bool {
        self.cells.get(index).is_some_and(|c| c.is_mine)
    }

    /// Indices of every mine, ascending.
    pub fn mine_positions(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.is_mine.then_some(i))
            .collect()
    }

    /// Number of opened cells that are not mines.
    pub fn revealed_safe(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.is_revealed && !c.is_mine)
            .count()
    }

    /// Opens a cell. The caller has already bounds-checked `index`.
    pub(crate) fn open(&mut self, index: usize) -> Opened {
        let cell = &mut self.cells[index];
        if cell.is_revealed {
            return Opened::AlreadyOpen;
        }
        cell.is_revealed = true;
        if cell.is_mine {
            Opened::Mine
        } else {
            Opened::Safe
        }
    }

    /// Client view of every cell. Unopened mines are only shown when
    /// `show_mines` is set (after the round ends).
    pub fn views(&self, show_mines: bool) -> Vec<CellView> {
        self.cells
            .iter()
            .map(|c| {
                if c.is_mine && (c.is_revealed || show_mines) {
                    CellView::Mine
                } else if c.is_revealed {
                    CellView::Safe
                } else {
                    CellView::Hidden
                }
            })
            .collect()
    }
}


/// Returns the cell count of a grid that can hold `mine_count` mines and
/// at least one safe cell.
fn check_counts(rows: usize, cols: usize, mine_count: usize) -> Result<usize, RoundError> {
    let len = rows * cols;
    if len == 0 {
        return Err(RoundError::InvalidConfiguration(
            "grid must have at least one cell".into(),
        ));
    }
    if mine_count == 0 || mine_count >= len {
        return Err(RoundError::InvalidConfiguration(format!(
            "mine count must be between 1 and {}, got {mine_count}",
            len - 1
        )));
    }
    Ok(len)
}
