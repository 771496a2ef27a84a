use anyhow::{Context, Result};
use clap::Parser;
use ambiente::{config, tui};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ambiente")]
#[command(about = "Terminal backoffice for the Secretaría de Ambiente")]
#[command(version)]
struct Args {
    /// Initialize configuration
    #[arg(long)]
    init: bool,

    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

/// The TUI owns the terminal, so logs go to a file in the data dir.
fn init_logging(config: &config::Config) -> Result<PathBuf> {
    let log_dir = config::data_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("ambiente.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env("AMBIENTE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("ambiente=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(log_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init {
        config::init_wizard().await?;
        return Ok(());
    }

    let config = config::load(args.config.as_deref())?;
    let log_path = init_logging(&config)?;
    tracing::info!(
        "Starting ambiente against {} (log: {})",
        config.backend.base_url(),
        log_path.display()
    );

    // Run TUI
    tui::run(config).await
}
