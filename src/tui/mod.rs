//! Terminal UI for a Reversi session.
//!
//! The UI never touches the controller: it renders the latest
//! [`SessionView`] from a watch channel and sends [`Intent`]s to a
//! [`SessionDriver`] running on its own task.

mod input;
mod ui;

pub use input::move_cursor;

use crate::config::ClientConfig;
use crate::driver::{Intent, SessionDriver};
use crate::protocol::RoomRequest;
use crate::session::{SessionController, SessionView};
use crate::transport::WsConnector;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reversi_board::Pos;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Connects with `request` and runs the interactive client until the user
/// quits.
pub async fn run_tui(config: ClientConfig, request: RoomRequest) -> Result<()> {
    init_file_logging(config.log_file())?;
    info!(server_url = %config.server_url(), room = %request.channel(), "Starting Reversi TUI");

    let endpoint = config.endpoint()?;
    let (connector, events) = WsConnector::channel();
    let controller = SessionController::new(connector, endpoint);
    let mut views = controller.subscribe();
    let (intents, intent_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(SessionDriver::new(controller, events, intent_rx).run());

    intents.send(Intent::Connect(request.clone()))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut views, &intents, &request).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if intents.send(Intent::Quit).is_err() {
        warn!("Session loop already stopped");
    }
    match driver.await {
        Ok(controller) => info!(phase = %controller.phase(), "Session closed"),
        Err(err) => error!(error = %err, "Session task failed"),
    }

    if let Err(err) = &res {
        error!(error = ?err, "UI loop error");
    }
    res
}

fn init_file_logging(path: &Path) -> Result<()> {
    let log_file = std::fs::File::create(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init(); // Don't panic if already initialized
    Ok(())
}

#[instrument(skip_all, fields(room = %request.channel()))]
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    views: &mut watch::Receiver<SessionView>,
    intents: &mpsc::UnboundedSender<Intent>,
    request: &RoomRequest,
) -> Result<()> {
    let mut cursor = Pos::new(3, 3)?;
    let mut hint: Option<String> = None;

    loop {
        let view = views.borrow_and_update().clone();
        terminal.draw(|f| ui::draw(f, &view, cursor, hint.as_deref()))?;

        if !event::poll(POLL_INTERVAL)? {
            tokio::task::yield_now().await;
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Enter | KeyCode::Char(' ') => match view.check_move(cursor) {
                Ok(_) => {
                    hint = None;
                    intents.send(Intent::Move(cursor))?;
                }
                Err(rejection) => hint = Some(rejection.to_string()),
            },
            KeyCode::Char('r') => intents.send(Intent::ListRooms)?,
            KeyCode::Char('s') => intents.send(Intent::StandByList)?,
            KeyCode::Char('c') => {
                hint = None;
                intents.send(Intent::Connect(request.clone()))?;
            }
            KeyCode::Char('d') => intents.send(Intent::Disconnect)?,
            code => {
                let moved = move_cursor(cursor, code);
                if moved != cursor {
                    hint = None;
                    cursor = moved;
                }
            }
        }
    }

    info!("User quit");
    Ok(())
}
