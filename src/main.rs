use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod error;
mod gemini;
mod handler;
mod response;
mod tui;
mod ui;

use app::App;
use config::{Config, API_KEY_ENV};
use gemini::GeminiClient;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(version, about = "Chat with Gemini in the terminal; JSON year/value replies are drawn as a line chart")]
struct Cli {
    /// Gemini model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,
    /// API base URL (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,
    /// Where to write diagnostic logs
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// The TUI owns the terminal, so logs go to a file. `RUST_LOG` controls the level.
fn init_logging(log_file: Option<PathBuf>) -> Result<PathBuf> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join("gemchat")
            .join("gemchat.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gemchat=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(cli.log_file)?;

    let config = Config::load()?
        .with_overrides(std::env::var(API_KEY_ENV).ok(), cli.model, cli.endpoint)
        .resolve()?;
    info!(model = %config.model, endpoint = %config.endpoint, log = %log_path.display(), "starting gemchat");

    let client = GeminiClient::new(config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(client, events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("exiting");
    result
}
