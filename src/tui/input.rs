//! Cursor movement for keyboard navigation.

use crossterm::event::KeyCode;
use reversi_board::Pos;

/// Moves cursor based on arrow keys. Stops at the edges.
pub fn move_cursor(cursor: Pos, key: KeyCode) -> Pos {
    let dir = match key {
        KeyCode::Left => (-1, 0),
        KeyCode::Right => (1, 0),
        KeyCode::Up => (0, -1),
        KeyCode::Down => (0, 1),
        _ => return cursor,
    };
    cursor.step(dir).unwrap_or(cursor)
}
