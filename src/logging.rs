use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `pokedex=debug`)
pub const LOG_ENV: &str = "POKEDEX_LOG";

/// Route tracing output to a daily log file.
///
/// The terminal belongs to the TUI, so nothing is written to stderr. Keep the
/// returned guard alive for the whole run or buffered lines are lost.
pub fn init() -> Result<WorkerGuard> {
  let log_dir = log_directory()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let file_appender = tracing_appender::rolling::daily(&log_dir, "pokedex.log");
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  tracing::info!(dir = %log_dir.display(), "Logging initialized");
  Ok(guard)
}

fn log_directory() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("pokedex").join("logs"))
}
