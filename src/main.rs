mod app;
mod cache;
mod catalog;
mod commands;
mod config;
mod event;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "A terminal UI for browsing and editing a REST product catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./shelf.yaml or $XDG_CONFIG_HOME/shelf/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the product service
  #[arg(long)]
  api_url: Option<String>,

  /// Start with the product list limited to this category (repeatable)
  #[arg(short = 'C', long = "category")]
  categories: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }

  // Flushes buffered log lines on drop
  let _log_guard = init_logging(&config.log)?;
  info!(version = env!("CARGO_PKG_VERSION"), "shelf starting");

  let mut app = app::App::new(&config, args.categories)?;
  app.run().await
}

/// Log to a daily rolling file; the terminal belongs to the UI.
///
/// `SHELF_LOG` takes precedence over `RUST_LOG`, which takes precedence over
/// `log.level` from the config.
fn init_logging(log: &config::LogConfig) -> Result<WorkerGuard> {
  let dir = log.resolved_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "shelf.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("SHELF_LOG")
    .or_else(|_| EnvFilter::try_from_default_env())
    .or_else(|_| EnvFilter::try_new(&log.level))
    .map_err(|e| eyre!("Invalid log filter: {}", e))?;

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
