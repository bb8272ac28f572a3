//! AHK Manager - command line entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use single_instance::SingleInstance;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ahk_manager::cli::{self, Cli};
use ahk_manager::core::{AppState, ProcessManager, Settings};
use ahk_manager::persistence::Database;
use ahk_manager::{APP_NAME, APP_VERSION};

/// Lock name shared by every running manager
const INSTANCE_LOCK: &str = "ahk-manager-single-instance";

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure only one manager owns the database and the script processes
    let instance =
        SingleInstance::new(INSTANCE_LOCK).context("Failed to create single instance lock")?;
    if !instance.is_single() {
        eprintln!("{} is already running!", APP_NAME);
        return Ok(());
    }

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(Settings::default_data_directory);
    let db = Database::open(&data_dir)?;
    db.initialize()?;

    let mut settings = db.load_settings()?.unwrap_or_default();
    init_logging(settings.debug_logging);
    info!("{} v{} starting...", APP_NAME, APP_VERSION);
    info!("Data directory: {:?}", data_dir);

    if let Some(executable) = &cli.executable {
        settings.script_executable = executable.clone();
    }

    let launcher = Arc::new(ProcessManager::new());
    let mut state = AppState::with_settings(db, launcher, settings)?;
    info!("Application state initialized");

    let stdout = std::io::stdout();
    let result = cli::run(cli, &mut state, &mut stdout.lock());
    if let Err(e) = &result {
        error!("{:#}", e);
    }

    info!("{} shutting down", APP_NAME);
    result
}

/// Initialize the logging system
fn init_logging(debug: bool) {
    let default = if debug {
        "ahk_manager=debug"
    } else {
        "ahk_manager=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
