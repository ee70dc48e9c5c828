mod app;
mod handler;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use kairos_core::storage::FileStore;
use kairos_core::{ChatSession, Config, HttpRelayClient, SystemClock};
use tracing_subscriber::EnvFilter;

use crate::app::{App, TerminalSurface};
use crate::tui::{EventHandler, TICK_RATE};

#[derive(Parser)]
#[command(name = "kairos")]
#[command(about = "Terminal chat with Kairos, the 3D scanning assistant")]
#[command(version)]
struct Cli {
    /// Relay endpoint URL (overrides KAIROS_RELAY_URL and the config file)
    #[arg(short, long)]
    relay_url: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where chat history and the logo are stored
    #[arg(long)]
    store: Option<PathBuf>,

    /// Attach an image to the first message
    #[arg(long)]
    image: Option<PathBuf>,
}

/// Log to ~/.config/kairos/kairos.log so the terminal stays clean.
/// Default: WARN level, RUST_LOG override.
fn init_logging() {
    if let Err(e) = init_logging_inner() {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

fn init_logging_inner() -> Result<()> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
    let log_dir = config_dir.join("kairos");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("kairos.log"))?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_ansi(false)
        .init();

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load config")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = load_config(cli.config.as_deref())?;
    let relay_url = cli.relay_url.unwrap_or_else(|| config.relay_url());
    let relay = HttpRelayClient::new(&relay_url).context("Failed to create relay client")?;

    let store_path = match cli.store {
        Some(path) => path,
        None => FileStore::default_path()?,
    };
    let store = FileStore::open(store_path);

    let session = ChatSession::open(
        Box::new(store),
        TerminalSurface::default(),
        Arc::new(SystemClock::new()),
    );
    let mut app = App::new(session, Arc::new(relay), &relay_url);
    if let Some(image) = &cli.image {
        app.attach_image(image);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    if let Some(task) = app.relay_task.take() {
        task.abort();
    }
    Ok(())
}
