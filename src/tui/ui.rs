//! Stateless UI rendering for a Reversi session.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color as Tint, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use reversi_board::{Cell, Pos, SIZE};

use crate::session::{Phase, SessionView};

const CELL_WIDTH: u16 = 3;
const BOARD_WIDTH: u16 = CELL_WIDTH * SIZE as u16 + 5;
const BOARD_HEIGHT: u16 = SIZE as u16 + 3;

const KEY_HELP: &str =
    "←↑→↓ move  Enter/Space place  r rooms  s stand-by  c reconnect  d disconnect  q quit";

/// Renders the board, the status panel and the key help.
pub fn draw(frame: &mut Frame, view: &SessionView, cursor: Pos, hint: Option<&str>) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Title
            Constraint::Min(BOARD_HEIGHT),    // Board + status
            Constraint::Length(3),            // Keys
        ])
        .split(area);

    let title = Paragraph::new(title_line(view))
        .style(Style::default().fg(Tint::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(BOARD_WIDTH + 4), Constraint::Min(20)])
        .split(chunks[1]);

    draw_board(frame, body[0], view, cursor);
    draw_status(frame, body[1], view, hint);

    let keys = Paragraph::new(KEY_HELP)
        .style(Style::default().fg(Tint::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(keys, chunks[2]);
}

fn title_line(view: &SessionView) -> String {
    match &view.room {
        Some(room) => format!("Reversi - room {}", room),
        None => "Reversi".to_string(),
    }
}

fn draw_board(frame: &mut Frame, area: Rect, view: &SessionView, cursor: Pos) {
    let board_area = center_rect(area, BOARD_WIDTH, BOARD_HEIGHT);
    let show_hints = view.is_my_turn();

    let mut lines = Vec::with_capacity(SIZE + 1);
    let header: String = (0..SIZE).map(|x| format!(" {} ", x)).collect();
    lines.push(Line::from(Span::styled(
        format!("  {}", header),
        Style::default().fg(Tint::DarkGray),
    )));

    for (y, row) in view.board.rows().enumerate() {
        let mut spans = vec![Span::styled(
            format!("{} ", y),
            Style::default().fg(Tint::DarkGray),
        )];
        for (x, cell) in row.iter().enumerate() {
            let is_cursor = cursor.x() == x && cursor.y() == y;
            spans.push(cell_span(*cell, is_cursor, show_hints));
        }
        lines.push(Line::from(spans));
    }

    let board =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Board "));
    frame.render_widget(board, board_area);
}

fn cell_span(cell: Cell, is_cursor: bool, show_hints: bool) -> Span<'static> {
    let disc = Style::default()
        .fg(Tint::White)
        .bg(Tint::Green)
        .add_modifier(Modifier::BOLD);
    let (symbol, style) = match cell {
        Cell::Black => (" ● ", disc),
        Cell::White => (" ○ ", disc),
        Cell::Available if show_hints => {
            (" · ", Style::default().fg(Tint::Yellow).bg(Tint::Green))
        }
        Cell::Available | Cell::Empty => ("   ", Style::default().bg(Tint::Green)),
    };

    let style = if is_cursor {
        style.bg(Tint::Gray).fg(Tint::Black)
    } else {
        style
    };
    Span::styled(symbol, style)
}

fn draw_status(frame: &mut Frame, area: Rect, view: &SessionView, hint: Option<&str>) {
    let count = view.board.count();
    let mut lines = vec![
        Line::from(format!("Phase:  {}", view.phase)),
        Line::from(format!(
            "You:    {}",
            view.own_color.map_or("-".to_string(), |c| c.to_string())
        )),
        Line::from(format!(
            "Turn:   {}",
            view.turn.map_or("-".to_string(), |c| c.to_string())
        )),
        Line::from(format!("Discs:  ● {}  ○ {}", count.black, count.white)),
    ];

    match view.phase {
        Phase::Playing if view.must_pass() => lines.push(Line::from(Span::styled(
            "No legal move, waiting for the server to pass",
            Style::default().fg(Tint::Yellow),
        ))),
        Phase::Playing if view.is_my_turn() => lines.push(Line::from(Span::styled(
            "Your move",
            Style::default().fg(Tint::Green).add_modifier(Modifier::BOLD),
        ))),
        Phase::GameOver => {
            if let Some(outcome) = view.outcome {
                lines.push(Line::from(Span::styled(
                    format!("Game over: {}", outcome),
                    Style::default().fg(Tint::Magenta).add_modifier(Modifier::BOLD),
                )));
            }
        }
        _ => {}
    }

    lines.push(Line::from(""));
    if let Some(notice) = &view.notice {
        lines.push(Line::from(format!("Server: {}", notice)));
    }
    if let Some(err) = &view.last_error {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", err),
            Style::default().fg(Tint::Red),
        )));
    }
    if let Some(hint) = hint {
        lines.push(Line::from(Span::styled(
            hint.to_string(),
            Style::default().fg(Tint::Yellow),
        )));
    }

    if !view.rooms.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Rooms:"));
        for room in &view.rooms {
            let players: Vec<&str> = room.players.iter().map(|p| p.name.as_str()).collect();
            let marker = if room.is_open() { "open" } else { "full" };
            lines.push(Line::from(format!(
                "  {} [{}] {}",
                room.name,
                marker,
                players.join(", ")
            )));
        }
    }

    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(status, area);
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((area.height.saturating_sub(height)) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((area.width.saturating_sub(width)) / 2),
        ])
        .split(vert[1])[1]
}
