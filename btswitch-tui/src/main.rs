/*!
 * bt-switch TUI
 * Pick devices and a target, then switch, push or pull
 */

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

mod app;
mod ui;
mod worker;

use app::App;
use btswitch::{default_config_path, local_hostname, ConfigStore, Operation, CONFIG_ENV};
use ui::render_ui;

#[derive(Parser)]
#[command(name = "bt-switch-tui")]
#[command(about = "bt-switch terminal dashboard")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Write logs to this file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        let log_level = if cli.debug { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("btswitch={log_level},bt_switch_tui={log_level}"))
        });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init();
    }

    let path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut app = App::new(ConfigStore::new(path), local_hostname()?)?;

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create ticker for UI updates
    let mut ticker = interval(Duration::from_millis(100));

    let result = loop {
        // Handle events
        match event::poll(Duration::from_millis(0)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if !handle_key(&mut app, key) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }

        ticker.tick().await;
        app.poll().await;

        if let Err(e) = terminal.draw(|f| render_ui(f, &app)) {
            break Err(e.into());
        }
    };

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

/// Applies one key press. Returns false when the user quits.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if let Some(form) = app.form.as_mut() {
        match key.code {
            KeyCode::Esc => app.cancel_form(),
            KeyCode::Enter => app.submit_form(),
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) => form.insert(c),
            _ => {}
        }
        return true;
    }

    match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Tab => app.next_tab(),
        KeyCode::Up => app.previous(),
        KeyCode::Down => app.next(),
        KeyCode::Char(' ') => app.toggle_device(),
        KeyCode::Char('g') => app.cycle_group(),
        KeyCode::Char('t') => app.cycle_target(),
        KeyCode::Char('s') => app.start(Operation::Switch),
        KeyCode::Char('p') => app.start(Operation::Push),
        KeyCode::Char('l') => app.start(Operation::Pull),
        KeyCode::Char('r') => {
            app.refresh();
            app.log("Config reloaded");
        }
        KeyCode::Char('a') => app.open_form(),
        KeyCode::Char('e') => app.open_edit_form(),
        KeyCode::Char('d') => app.delete_selected(),
        _ => {}
    }
    true
}
