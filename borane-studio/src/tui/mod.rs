mod app;
mod input;
mod ui;

use std::io;
use std::time::Duration;

use borane_studio::{GeminiConnector, Studio, StudioError};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use app::StudioApp;

/// Runs the interactive studio until the user quits. Returns the studio so
/// the caller can release what it still holds.
pub async fn run(studio: Studio<GeminiConnector>) -> Result<Studio<GeminiConnector>, StudioError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = StudioApp::new(studio);

    let result = run_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.map(|()| app.studio)
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut StudioApp,
) -> Result<(), StudioError> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // Short poll so spawned work gets applied promptly
        if event::poll(Duration::from_millis(50))? {
            let event = event::read()?;
            input::handle_event(app, event);
        }

        app.poll_events();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
