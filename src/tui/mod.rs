mod app;
mod chart;
mod events;
mod process_colors;
mod ui;

pub use app::App;
pub use chart::{CELL_H, CELL_W, ChartWidget, process_label};
pub use events::{AppEvent, EventHandler};
pub use process_colors::{command_category_color, process_category_color};

use crate::view::session::{Session, TraceSource};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::{self, OpenOptions};
use std::io;

/// Log to a file under the cache directory, only when RUST_LOG is set;
/// the terminal belongs to the chart
fn init_file_logging() -> io::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        return Ok(());
    }

    let log_dir = dirs::cache_dir()
        .or_else(dirs::state_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("bootchart-tui");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("bootchart-tui.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .parse_default_env()
        .init();

    log::info!("Starting bootchart-tui - log file: {}", log_path.display());
    Ok(())
}

pub fn run_tui<S: TraceSource>(session: Session<S>) -> io::Result<()> {
    init_file_logging()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);

    // Run the main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B, S>(terminal: &mut Terminal<B>, app: &mut App<S>) -> io::Result<()>
where
    B: ratatui::backend::Backend,
    B::Error: Into<io::Error>,
    S: TraceSource,
{
    let mut events = EventHandler::new();

    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .map_err(Into::<io::Error>::into)?;

        if let Some(event) = events.next()? {
            app.handle_event(event);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
