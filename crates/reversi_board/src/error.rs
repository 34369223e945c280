//! Board engine error types.

use crate::types::Cell;

/// Caller-side precondition violations reported by the board engine.
///
/// None of these are game-rule outcomes: an illegal move is answered with
/// `false`, never with an error. These indicate a bug in the caller or a
/// malformed value arriving from outside.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// Coordinates outside the 8x8 grid.
    #[display("Position ({}, {}) is off the 8x8 board", x, y)]
    OutOfBounds {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },

    /// Asked for the opposite color of a cell that holds no disc.
    #[display("{} cell has no opposite color", _0)]
    NotAPiece(Cell),

    /// Unknown cell name.
    #[display("Invalid cell value: {:?}", _0)]
    InvalidCell(String),

    /// Unknown color name.
    #[display("Invalid color: {:?}", _0)]
    InvalidColor(String),

    /// A snapshot did not hold exactly 64 cells.
    #[display("Snapshot has {} cells, expected 64", _0)]
    SnapshotLength(usize),
}

impl std::error::Error for BoardError {}
