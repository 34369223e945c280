//! Core domain types for Reversi.

use crate::BoardError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Side length of the board.
pub const SIZE: usize = 8;

/// Number of cells on the board.
pub const CELL_COUNT: usize = SIZE * SIZE;

/// Disc color.
///
/// Parsing is case-insensitive (`"black"`, `"BLACK"` and `"Black"` are all
/// accepted); formatting uses the capitalized variant name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(try_from = "String")]
#[strum(ascii_case_insensitive)]
pub enum Color {
    /// Black (moves first).
    Black,
    /// White.
    White,
}

impl Color {
    /// Returns the other color.
    pub fn opposite(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Parses a color name, case-insensitively.
    #[instrument]
    pub fn parse(s: &str) -> Result<Self, BoardError> {
        Self::from_str(s.trim()).map_err(|_| BoardError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = BoardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// A single board cell.
///
/// `Available` is a local UI hint ("legal destination for the side to
/// move") and never a game fact.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Cell {
    /// No disc.
    #[default]
    Empty,
    /// Black disc.
    Black,
    /// White disc.
    White,
    /// Empty cell marked as a legal destination.
    Available,
}

impl Cell {
    /// Parses a cell name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, BoardError> {
        Self::from_str(s.trim()).map_err(|_| BoardError::InvalidCell(s.to_string()))
    }

    /// Returns the disc color, if the cell holds one.
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Black => Some(Color::Black),
            Cell::White => Some(Color::White),
            Cell::Empty | Cell::Available => None,
        }
    }

    /// True for cells holding a disc.
    pub fn is_piece(self) -> bool {
        self.color().is_some()
    }

    /// True for cells a disc could be placed on (`Empty` or `Available`).
    pub fn is_vacant(self) -> bool {
        !self.is_piece()
    }

    /// Returns the disc of the opposite color.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotAPiece`] for `Empty` and `Available`.
    pub fn opposite(self) -> Result<Cell, BoardError> {
        self.color()
            .map(|color| Cell::from(color.opposite()))
            .ok_or(BoardError::NotAPiece(self))
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }
}

/// A coordinate on the board, `x` is the column and `y` the row.
///
/// Always in range: the only way to build one is through a checked
/// constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    x: u8,
    y: u8,
}

impl Pos {
    /// Creates a position.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfBounds`] unless `x < 8 && y < 8`.
    pub fn new(x: usize, y: usize) -> Result<Self, BoardError> {
        if x >= SIZE || y >= SIZE {
            return Err(BoardError::OutOfBounds { x, y });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// Creates a position from a row-major index.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < CELL_COUNT).then(|| Self {
            x: (index % SIZE) as u8,
            y: (index / SIZE) as u8,
        })
    }

    /// Column.
    pub fn x(self) -> usize {
        self.x as usize
    }

    /// Row.
    pub fn y(self) -> usize {
        self.y as usize
    }

    /// Row-major index (`y * 8 + x`).
    pub fn index(self) -> usize {
        self.y() * SIZE + self.x()
    }

    /// Steps one cell in direction `(dx, dy)`, `None` when that leaves the board.
    pub fn step(self, (dx, dy): (i8, i8)) -> Option<Self> {
        let x = self.x as i8 + dx;
        let y = self.y as i8 + dy;
        if !(0..SIZE as i8).contains(&x) || !(0..SIZE as i8).contains(&y) {
            return None;
        }
        Some(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// All 64 positions in row-major order.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..CELL_COUNT).filter_map(Pos::from_index)
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
