//! Pure Reversi board engine.
//!
//! Holds the 8x8 grid, answers "is this move legal?" by direction scanning,
//! and accepts authoritative snapshots wholesale. No I/O, no session state,
//! no flipping: flips are decided by the remote authority and arrive as
//! full-board snapshots.
//!
//! ```
//! use reversi_board::{Board, Color, Pos};
//!
//! let board = Board::opening();
//! assert!(board.is_legal_move(Pos::new(2, 3)?, Color::Black));
//! assert!(!board.is_legal_move(Pos::new(2, 3)?, Color::White));
//! # Ok::<(), reversi_board::BoardError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod error;
mod types;

pub use board::{Board, DIRECTIONS, DiscCount};
pub use error::BoardError;
pub use types::{CELL_COUNT, Cell, Color, Pos, SIZE};
