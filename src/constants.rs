//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` and parsed once on first access.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Maximum number of items requested from the provider per listing.
  pub list_limit: usize,
  pub search_history_cap: usize,
  pub recent_searches_shown: usize,

  pub status_secs: u64,
  pub tick_millis: u64,
  pub rescan_millis: u64,

  /// Length of a video id at the end of a cached file stem.
  pub id_length: usize,
  pub video_extensions: Vec<String>,

  pub download_format: String,
  pub player_args: Vec<String>,
}

impl Constants {
  pub fn status_lifetime(&self) -> Duration {
    Duration::from_secs(self.status_secs)
  }

  pub fn tick(&self) -> Duration {
    Duration::from_millis(self.tick_millis)
  }

  pub fn rescan_interval(&self) -> Duration {
    Duration::from_millis(self.rescan_millis)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; a malformed file fails on first access in any test run.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
