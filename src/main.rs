//! pgnav - keyboard-driven PostgreSQL browser for the terminal
//!
//! Sets up logging, the terminal and the executor, then runs the event
//! loop. All behavior lives in the library.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
    EventStream,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use pgnav::app::{App, AppEvent};
use pgnav::config::{ensure_config_dir, load_settings};
use pgnav::db::PgConnector;
use pgnav::executor::{Executor, TcpDiscoverer};
use pgnav::logging::{self, LoggingConfig};
use pgnav::store::{KeyringSecrets, Stores};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "pgnav", version, about)]
struct Cli {
    /// Connection URL, e.g. postgres://user@localhost:5432/app
    url: Option<String>,

    /// Directory for settings, history, favorites and logs
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Log level for pgnav (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = ensure_config_dir(cli.config_dir.as_deref())
        .context("could not create the config directory")?;
    let _log_guard = logging::init(&LoggingConfig::new(&config_dir, cli.log_level.as_deref()))
        .context("could not initialize logging")?;

    let settings = match load_settings(&config_dir) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "invalid settings file; using defaults");
            Default::default()
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let stores = Arc::new(Stores::open(
        &config_dir,
        settings.history_size,
        Arc::new(KeyringSecrets::new()),
    ));
    let executor = Executor::new(
        tx.clone(),
        Arc::new(PgConnector),
        Arc::new(TcpDiscoverer::new(
            settings.discovery_hosts.clone(),
            settings.discovery_ports.clone(),
        )),
        stores,
        &settings,
    );

    let mut terminal = setup_terminal().context("could not set up the terminal")?;
    let reader = tokio::spawn(read_terminal_events(tx));

    let mut app = App::new(settings);
    if let Ok(size) = terminal.size() {
        app.viewport = (size.width, size.height);
    }
    info!(url = cli.url.is_some(), "starting session");
    executor.execute_all(app.startup(cli.url.as_deref()));

    let result = run(&mut terminal, &mut app, &executor, &mut rx).await;

    reader.abort();
    restore_terminal(&mut terminal).context("could not restore the terminal")?;
    if let Err(e) = &result {
        error!(error = %e, "session ended with an error");
    }
    result
}

async fn run(
    terminal: &mut Tui,
    app: &mut App,
    executor: &Executor,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    while app.running {
        terminal.draw(|frame| pgnav::ui::render::render(frame, app))?;
        let Some(event) = rx.recv().await else {
            break;
        };
        let commands = app.handle(event);
        executor.execute_all(commands);
    }
    Ok(())
}

/// Forward terminal input to the controller until the stream ends
async fn read_terminal_events(tx: mpsc::UnboundedSender<AppEvent>) {
    let mut events = EventStream::new();
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(Event::Key(key)) => AppEvent::Key(key),
            Ok(Event::Mouse(mouse)) => AppEvent::Mouse(mouse),
            Ok(Event::Resize(width, height)) => AppEvent::Resize(width, height),
            Ok(Event::Paste(text)) => AppEvent::Paste(text),
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "terminal read failed");
                break;
            }
        };
        if tx.send(event).is_err() {
            break;
        }
    }
}

fn setup_terminal() -> io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    // leave the terminal usable if anything panics while the UI is up
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            DisableBracketedPaste
        );
        default_hook(info);
    }));
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()
}
