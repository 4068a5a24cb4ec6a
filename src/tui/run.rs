//! TUI entry point and terminal setup.

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::storage::Storage;
use crate::store::Store;
use crate::tui::app::App;

/// Initialise and run the terminal user interface over `store`.
///
/// The terminal is restored even when the app loop fails.
pub fn run_tui<S: Storage>(store: &mut Store<S>, config: &Config) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    tracing::info!("ui started");
    let mut app = App::new(store, config.week_start);
    let result = app.run(&mut terminal);
    app.close();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    tracing::info!("ui stopped");

    result
}
