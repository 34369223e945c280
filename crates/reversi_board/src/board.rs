//! The 8x8 grid and direction-scanning legality checks.
//!
//! The board never computes or applies flips. Flips are the authoritative
//! server's business; the local grid is replaced wholesale from its snapshots.

use crate::types::{CELL_COUNT, Cell, Color, Pos, SIZE};
use crate::BoardError;
use tracing::{instrument, trace};

/// The eight compass directions as `(dx, dy)` steps.
pub const DIRECTIONS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Disc and hint counts for a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscCount {
    /// Black discs.
    pub black: usize,
    /// White discs.
    pub white: usize,
    /// Cells marked `Available`.
    pub available: usize,
    /// Plain empty cells.
    pub empty: usize,
}

impl DiscCount {
    /// Black plus white.
    pub fn occupied(&self) -> usize {
        self.black + self.white
    }
}

/// 8x8 Reversi board, cells in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Creates a board with every cell empty.
    pub fn empty() -> Self {
        Self {
            cells: [Cell::Empty; CELL_COUNT],
        }
    }

    /// Creates the canonical opening position with Black's four legal
    /// destinations marked `Available`.
    #[instrument]
    pub fn opening() -> Self {
        let mut board = Self::empty();
        let center = [
            (3, 3, Cell::White),
            (4, 4, Cell::White),
            (4, 3, Cell::Black),
            (3, 4, Cell::Black),
        ];
        for (x, y, cell) in center {
            board.cells[y * SIZE + x] = cell;
        }
        board.mark_available(Color::Black);
        board
    }

    /// Builds a board from 64 row-major cells.
    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    /// Returns the cell at `pos`.
    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[pos.index()]
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Iterates over the eight rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(SIZE)
    }

    /// Whether placing a `color` disc at `pos` is legal.
    ///
    /// The target must be vacant (`Empty` or `Available`); an occupied cell
    /// is never legal. Otherwise the move is legal when at least one
    /// direction runs over one or more `color.opposite()` discs and then
    /// reaches a `color` disc before leaving the board. The first such
    /// direction settles it.
    #[instrument(level = "trace", skip(self))]
    pub fn is_legal_move(&self, pos: Pos, color: Color) -> bool {
        if !self.get(pos).is_vacant() {
            trace!(%pos, "target occupied");
            return false;
        }
        DIRECTIONS.iter().any(|&dir| self.brackets(pos, color, dir))
    }

    /// Scans one direction from `pos` for a run of opposite discs capped by
    /// a `color` disc.
    fn brackets(&self, pos: Pos, color: Color, dir: (i8, i8)) -> bool {
        let own = Cell::from(color);
        let other = Cell::from(color.opposite());

        let mut cursor = match pos.step(dir) {
            Some(next) if self.get(next) == other => next.step(dir),
            _ => return false,
        };

        while let Some(p) = cursor {
            match self.get(p) {
                cell if cell == own => return true,
                cell if cell == other => cursor = p.step(dir),
                _ => return false,
            }
        }
        false
    }

    /// Every legal destination for `color`, row-major.
    #[instrument(skip(self))]
    pub fn legal_moves(&self, color: Color) -> Vec<Pos> {
        Pos::all()
            .filter(|&pos| self.is_legal_move(pos, color))
            .collect()
    }

    /// Whether `color` has any legal destination.
    pub fn has_legal_move(&self, color: Color) -> bool {
        Pos::all().any(|pos| self.is_legal_move(pos, color))
    }

    /// Replaces the whole grid with an authoritative snapshot.
    ///
    /// Nothing is validated: the snapshot comes from the remote authority.
    #[instrument(skip_all)]
    pub fn apply_snapshot(&mut self, cells: [Cell; CELL_COUNT]) {
        self.cells = cells;
    }

    /// Like [`Board::apply_snapshot`], from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::SnapshotLength`] unless the slice has 64 cells;
    /// the grid is left untouched in that case.
    pub fn apply_snapshot_slice(&mut self, cells: &[Cell]) -> Result<(), BoardError> {
        let cells: [Cell; CELL_COUNT] = cells
            .try_into()
            .map_err(|_| BoardError::SnapshotLength(cells.len()))?;
        self.apply_snapshot(cells);
        Ok(())
    }

    /// Recomputes the `Available` hints for `color`.
    ///
    /// Every vacant cell becomes `Available` if it is a legal destination
    /// for `color` and `Empty` otherwise, so stale hints from the other
    /// side's turn are cleared in the same pass.
    #[instrument(skip(self))]
    pub fn mark_available(&mut self, color: Color) {
        for pos in Pos::all() {
            if !self.get(pos).is_vacant() {
                continue;
            }
            self.cells[pos.index()] = if self.is_legal_move(pos, color) {
                Cell::Available
            } else {
                Cell::Empty
            };
        }
    }

    /// Turns every `Available` hint back into `Empty`.
    pub fn clear_available(&mut self) {
        for cell in self.cells.iter_mut() {
            if *cell == Cell::Available {
                *cell = Cell::Empty;
            }
        }
    }

    /// Counts discs and hints.
    pub fn count(&self) -> DiscCount {
        self.cells
            .iter()
            .fold(DiscCount::default(), |mut count, cell| {
                match cell {
                    Cell::Black => count.black += 1,
                    Cell::White => count.white += 1,
                    Cell::Available => count.available += 1,
                    Cell::Empty => count.empty += 1,
                }
                count
            })
    }

    /// Formats the board as eight lines of text.
    ///
    /// `B` black, `W` white, `*` available, `.` empty.
    pub fn display(&self) -> String {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Black => 'B',
                        Cell::White => 'W',
                        Cell::Available => '*',
                        Cell::Empty => '.',
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}
