//! anon-chat TUI Entry Point
//!
//! Launches the terminal chat client.
//!
//! Usage:
//!   chat-tui [OPTIONS]
//!
//! Options:
//!   --server-url <URL>          Chat server base URL
//!   --poll-interval-ms <MS>     Milliseconds between polls
//!   --storage <PATH>            Identity storage file
//!   -c, --config <FILE>         Configuration file

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_core::{
    default_config_path, load_config_from_path, ChatConfig, ChatController, ConfigOverrides,
    FileStore, HttpChatApi, KeyValueStore, MemoryStore,
};
use chat_tui::App;

/// Default log filter when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "chat_core=info,chat_tui=info";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "chat-tui")]
#[command(author, version, about = "Anonymous chat in your terminal", long_about = None)]
struct Args {
    /// Chat server base URL
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,

    /// Milliseconds between polls for new messages
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// File holding the persisted user id
    #[arg(long, value_name = "PATH")]
    storage: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "ANON_CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(url) = &self.server_url {
            overrides = overrides.with_server_url(url.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            overrides = overrides.with_poll_interval_ms(ms);
        }
        if let Some(path) = &self.storage {
            overrides = overrides.with_storage_path(path.clone());
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    init_logging(config.log_path.as_deref())?;

    tracing::info!(
        server = %config.server_url,
        poll_interval = ?config.poll_interval,
        source = %config.source(),
        "Starting chat client"
    );

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: chat-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means stdin or stdout is piped, or the session");
        eprintln!("is non-interactive (CI, container, SSH without -t).");
        std::process::exit(1);
    }

    let store = open_store(&config);
    let api = HttpChatApi::with_timeout(&config.server_url, config.request_timeout)
        .context("Failed to create HTTP client")?;
    let mut controller = ChatController::new(Arc::new(api), config.controller_config());
    let user_id = controller
        .initialize(store.as_ref())
        .context("Failed to load or create the user id")?;
    tracing::info!(user_id = %user_id, "Identity ready");

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app; dropping it drops the controller and its poll timer
    let mut app = App::new(controller, config.server_url.clone());
    let result = app.run(&mut terminal).await;
    drop(app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}

/// Load and validate configuration (CLI > env > file > defaults)
fn load_config(args: &Args) -> anyhow::Result<ChatConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    config.apply_overrides(&args.overrides());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Send logs to a file; the terminal belongs to the UI
fn init_logging(log_path: Option<&Path>) -> anyhow::Result<()> {
    let Some(log_path) = log_path else {
        return Ok(());
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .init();

    Ok(())
}

/// The identity store, or an in-memory one when no data directory exists
fn open_store(config: &ChatConfig) -> Box<dyn KeyValueStore> {
    match &config.storage_path {
        Some(path) => Box::new(FileStore::new(path)),
        None => {
            tracing::warn!("No data directory; user id will not persist across sessions");
            Box::new(MemoryStore::new())
        }
    }
}
