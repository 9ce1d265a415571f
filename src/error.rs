//! Failure taxonomy for core transitions.
//!
//! None of these are fatal: each is recovered where the transition failed and
//! turned into a status line.

use thiserror::Error;

/// Search or channel fetch failed.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("{0} not found in PATH")]
  NotInstalled(&'static str),
  #[error("provider I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("provider failed: {0}")]
  Failed(String),
  #[error("request was dropped before it completed")]
  Cancelled,
}

/// A download or player process could not be started.
#[derive(Debug, Error)]
pub enum SpawnError {
  #[error("{0} not found in PATH")]
  NotInstalled(&'static str),
  #[error("could not start {program}: {source}")]
  Io {
    program: &'static str,
    #[source]
    source: std::io::Error,
  },
}

impl SpawnError {
  pub fn from_io(program: &'static str, source: std::io::Error) -> Self {
    if source.kind() == std::io::ErrorKind::NotFound {
      SpawnError::NotInstalled(program)
    } else {
      SpawnError::Io { program, source }
    }
  }
}

/// The channel of an item could not be determined.
#[derive(Debug, Error)]
#[error("no channel URL available")]
pub struct ResolutionFailure;
