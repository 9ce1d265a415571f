use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::constants;

/// Where configuration and cached data live.
#[derive(Debug, Clone)]
pub struct Paths {
  pub config_dir: PathBuf,
  pub cache_dir: PathBuf,
}

impl Paths {
  /// Platform directories for `ytui`, with optional overrides from the CLI.
  pub fn resolve(config_dir: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "ytui");
    let config_dir = config_dir
      .or_else(|| proj_dirs.as_ref().map(|d| d.config_dir().to_path_buf()))
      .ok_or_else(|| anyhow!("Could not determine a config directory; pass --config-dir"))?;
    let cache_dir = cache_dir
      .or_else(|| proj_dirs.as_ref().map(|d| d.cache_dir().to_path_buf()))
      .ok_or_else(|| anyhow!("Could not determine a cache directory; pass --cache-dir"))?;
    Ok(Self { config_dir, cache_dir })
  }

  pub fn log_dir(&self) -> PathBuf {
    self.cache_dir.join("logs")
  }

  pub fn prefs_file(&self) -> PathBuf {
    self.config_dir.join("prefs.toml")
  }
}

/// User preferences from `prefs.toml`. Every field is optional.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct Config {
  pub video_dir: Option<PathBuf>,
  pub search_limit: Option<usize>,
  pub download_format: Option<String>,
  pub player_args: Option<Vec<String>>,
}

impl Config {
  /// Missing or malformed prefs fall back to defaults.
  pub fn load(paths: &Paths) -> Self {
    Self::load_from(&paths.prefs_file())
  }

  fn load_from(file: &Path) -> Self {
    let Ok(content) = std::fs::read_to_string(file) else { return Self::default() };
    match toml::from_str(&content) {
      Ok(config) => config,
      Err(e) => {
        warn!(file = %file.display(), err = %e, "config: ignoring malformed prefs");
        Self::default()
      }
    }
  }

  pub fn video_dir(&self, paths: &Paths) -> PathBuf {
    self.video_dir.clone().unwrap_or_else(|| paths.cache_dir.join("videos"))
  }

  pub fn search_limit(&self) -> usize {
    self.search_limit.filter(|n| *n > 0).unwrap_or(constants().list_limit)
  }

  pub fn download_format(&self) -> String {
    self.download_format.clone().unwrap_or_else(|| constants().download_format.clone())
  }

  pub fn player_args(&self) -> Vec<String> {
    self.player_args.clone().unwrap_or_else(|| constants().player_args.clone())
  }
}
