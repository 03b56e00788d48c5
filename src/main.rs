use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod gemini;
mod handler;
mod image;
mod prompt;
mod session;
mod summary;
mod tui;
mod ui;

use app::{App, TextInput};
use config::{Config, API_KEY_ENV};
use gemini::GeminiClient;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "autosage")]
#[command(version, about = "Upload a vehicle photo and get specifications, features and insights from Gemini")]
struct Cli {
    /// Image to pre-fill the upload field with (jpg, jpeg or png)
    #[arg(short, long)]
    image: Option<PathBuf>,
    /// Gemini model to use (defaults to the saved choice or gemini-1.5-flash)
    #[arg(short, long)]
    model: Option<String>,
    /// Where to write logs (the terminal is owned by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the key may already be exported.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    // Dropping the guard flushes buffered log lines, so it lives until main returns.
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    let api_key = config.resolve_api_key(std::env::var(API_KEY_ENV).ok())?;
    let model_name = cli.model.clone().unwrap_or_else(|| config.model());

    let client = GeminiClient::new(&api_key, &config.api_base());
    let mut app = App::new(Arc::new(client), model_name);

    if let Some(path) = &cli.image {
        app.path_input = TextInput::with_value(&path.display().to_string());
        app.upload_from_input();
    }

    info!(model = %app.selected_model, "starting AutoSage");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    info!("exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<WorkerGuard> {
    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None => dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("autosage")
            .join("autosage.log"),
    };

    let (writer, guard) = log_writer(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

/// Append-mode log file behind a background writer thread.
fn log_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    Ok(tracing_appender::non_blocking(file))
}
