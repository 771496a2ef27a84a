mod app;
pub mod input;
pub mod login;
mod message;
mod ui;

use crate::backend::auth::AuthClient;
use crate::backend::rest::RestClient;
use crate::backend::session_store::SessionStore;
use crate::backend::{Backend, SupabaseBackend};
use crate::config::Config;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use app::{App, AppEvent, DashboardScreen, ListScreen, Modal, Screen, SPINNER_FRAMES};
pub use message::Message;

pub async fn run(config: Config) -> Result<()> {
    // Check if stdout is a terminal
    if !std::io::IsTerminal::is_terminal(&io::stdout()) {
        anyhow::bail!("ambiente requires an interactive terminal");
    }

    let store = SessionStore::in_data_dir().context("Failed to locate the session file")?;
    let base_url = config.backend.base_url().to_string();
    let anon_key = config.backend.anon_key.clone();
    let auth = Arc::new(AuthClient::new(&base_url, &anon_key, Some(store)));
    let backend: Arc<dyn Backend> = Arc::new(SupabaseBackend::new(
        RestClient::new(&base_url, &anon_key),
        Arc::clone(&auth),
    ));

    // Keeps the access token fresh for as long as the UI runs
    let refresher_cancel = CancellationToken::new();
    let refresher = auth.spawn_refresher(refresher_cancel.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let terminal_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(terminal_backend)?;

    // Create app state; the session check resolves in the background
    let mut app = App::new(config, backend, auth);
    app.check_session();

    let result = run_app(&mut terminal, &mut app).await;

    app.shutdown();
    refresher_cancel.cancel();
    if let Err(e) = refresher.await {
        tracing::warn!("Token refresher ended abnormally: {}", e);
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();
    let mut input_state = input::InputState::new();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        // Crossterm polling blocks; keep it off the async workers
        let ready = tokio::task::block_in_place(|| event::poll(timeout))?;
        if ready {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let msg = input::dispatch(app, &mut input_state, key);
                    if app.update(msg)? {
                        return Ok(()); // Quit requested
                    }
                }
            }
        }

        // Handle pending chord timeout (non-blocking)
        if input_state.has_timed_out() {
            input_state.clear();
        }

        if last_tick.elapsed() >= tick_rate {
            // Fold in poll results, task results and session changes
            app.on_tick();
            last_tick = std::time::Instant::now();
        }
    }
}
