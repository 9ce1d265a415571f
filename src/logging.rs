//! File logging. The TUI owns the terminal, so tracing output goes to a
//! daily-rotated file under the cache directory.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "ytui";
const DEFAULT_FILTER: &str = "ytui=info,warn";

/// Install the global subscriber. `RUST_LOG` wins over `level`, which wins
/// over the default filter.
///
/// The returned guard flushes buffered lines on drop; keep it alive until exit.
pub fn init(log_dir: &Path, level: Option<&str>) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir).with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

  let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level.map_or(DEFAULT_FILTER.to_string(), filter_for_level)))
    .context("Invalid log filter")?;

  let fmt_layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);

  tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().context("Failed to install logger")?;

  tracing::info!(dir = %log_dir.display(), "logging initialized");
  Ok(guard)
}

/// A bare level (`debug`) applies to this crate only; anything else is used
/// as a full filter directive.
fn filter_for_level(level: &str) -> String {
  match level.to_ascii_lowercase().as_str() {
    l @ ("trace" | "debug" | "info" | "warn" | "error") => format!("ytui={l},warn"),
    _ => level.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bare_level_scopes_to_crate() {
    assert_eq!(filter_for_level("DEBUG"), "ytui=debug,warn");
    assert_eq!(filter_for_level("ytui::app=trace"), "ytui::app=trace");
  }
}
