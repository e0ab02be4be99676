use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod chat;
mod config;
mod handler;
mod identity;
mod stream;
mod tui;
mod ui;

use app::App;
use config::{Config, DEFAULT_SERVER_URL};

#[derive(Parser)]
#[command(name = "qiro")]
#[command(about = "Terminal client for the Qiro AI assistant")]
struct Cli {
    /// Backend server URL (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    /// Opaque user id used to scope saved chats (overrides the config file)
    #[arg(long)]
    user: Option<String>,
}

/// Tracing goes to a file because stderr hosts the TUI. Filter via the
/// QIRO_LOG env var, default `info`.
fn init_tracing() -> Result<()> {
    let path = Config::log_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QIRO_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = Config::load().unwrap_or_else(|_| Config::new());

    // First run: write the default config so users can find where the
    // server URL and user id live.
    if !Config::exists() {
        if let Err(e) = config.save() {
            tracing::warn!("failed to write default config: {e}");
        }
    }

    let server_url = cli
        .server
        .clone()
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let identity = identity::resolve(&config, cli.user.as_deref());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(&server_url, identity, events.sender());
    app.refresh_chats();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event).await?,
            None => break,
        }
    }

    tui::restore()?;
    Ok(())
}
