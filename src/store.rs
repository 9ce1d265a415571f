//! Line-oriented persisted stores.
//!
//! Every store is loaded whole and rewritten whole; last writer wins. A
//! missing file loads as empty.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cache::{ChannelIndex, ChannelMeta};
use crate::config::Paths;
use crate::media::{Channel, MediaItem};

const FIELD_DELIM: &str = "|||";
const SUBSCRIPTIONS_HEADER: &str = "# Format: Name | URL";

#[derive(Debug, Clone)]
pub struct Store {
  config_dir: PathBuf,
  cache_dir: PathBuf,
}

impl Store {
  pub fn new(paths: &Paths) -> Self {
    Self { config_dir: paths.config_dir.clone(), cache_dir: paths.cache_dir.clone() }
  }

  fn history_file(&self) -> PathBuf {
    self.cache_dir.join("history.txt")
  }

  fn search_history_file(&self) -> PathBuf {
    self.cache_dir.join("search_history.txt")
  }

  fn channel_cache_file(&self) -> PathBuf {
    self.cache_dir.join("channels.txt")
  }

  fn channel_index_file(&self) -> PathBuf {
    self.cache_dir.join("channel_index.txt")
  }

  fn subscriptions_file(&self) -> PathBuf {
    self.config_dir.join("subscriptions")
  }

  // --- Play history ---

  pub fn load_history(&self) -> Result<Vec<MediaItem>> {
    Ok(read_lines(&self.history_file())?.iter().filter_map(|l| decode_item(l)).collect())
  }

  pub fn save_history(&self, items: &[MediaItem]) -> Result<()> {
    write_lines(&self.history_file(), items.iter().map(encode_item))
  }

  // --- Search history ---

  pub fn load_search_history(&self) -> Result<Vec<String>> {
    Ok(read_lines(&self.search_history_file())?.into_iter().filter(|l| !l.is_empty()).collect())
  }

  pub fn save_search_history(&self, entries: &[String]) -> Result<()> {
    write_lines(&self.search_history_file(), entries.iter().cloned())
  }

  // --- Subscriptions ---

  pub fn load_subscriptions(&self) -> Result<Vec<Channel>> {
    Ok(read_lines(&self.subscriptions_file())?.iter().filter_map(|l| parse_subscription(l)).collect())
  }

  pub fn save_subscriptions(&self, subs: &[Channel]) -> Result<()> {
    let lines = std::iter::once(SUBSCRIPTIONS_HEADER.to_string())
      .chain(subs.iter().map(|ch| format!("{} | {}", ch.name, ch.url)));
    write_lines(&self.subscriptions_file(), lines)
  }

  // --- Per-channel video cache ---

  pub fn load_channel_cache(&self) -> Result<HashMap<String, Vec<MediaItem>>> {
    let mut cache: HashMap<String, Vec<MediaItem>> = HashMap::new();
    for line in read_lines(&self.channel_cache_file())? {
      let Some((key, rest)) = line.split_once(FIELD_DELIM) else { continue };
      let key = unesc(key);
      let entry = cache.entry(key).or_default();
      if let Some(item) = decode_item(rest) {
        entry.push(item);
      }
    }
    Ok(cache)
  }

  pub fn save_channel_cache(&self, cache: &HashMap<String, Vec<MediaItem>>) -> Result<()> {
    let mut keys: Vec<&String> = cache.keys().collect();
    keys.sort();
    let lines = keys.into_iter().flat_map(|key| {
      let videos = &cache[key];
      let prefix = esc(key);
      // An empty listing is still a cache entry: keep a key-only line.
      let marker = videos.is_empty().then(|| format!("{prefix}{FIELD_DELIM}"));
      marker.into_iter().chain(videos.iter().map(move |v| format!("{prefix}{FIELD_DELIM}{}", encode_item(v))))
    });
    write_lines(&self.channel_cache_file(), lines)
  }

  // --- id -> channel index ---

  pub fn load_channel_index(&self) -> Result<ChannelIndex> {
    let entries = read_lines(&self.channel_index_file())?.into_iter().filter_map(|line| {
      let mut parts = line.split(FIELD_DELIM).map(unesc);
      let id = parts.next().filter(|s| !s.is_empty())?;
      let url = parts.next().filter(|s| !s.is_empty())?;
      let name = parts.next().filter(|s| !s.is_empty());
      Some((id, ChannelMeta { url, name }))
    });
    Ok(ChannelIndex::from_entries(entries))
  }

  pub fn save_channel_index(&self, index: &ChannelIndex) -> Result<()> {
    let lines = index.sorted().into_iter().map(|(id, meta)| {
      format!("{}{FIELD_DELIM}{}{FIELD_DELIM}{}", esc(id), esc(&meta.url), esc(meta.name.as_deref().unwrap_or("")))
    });
    write_lines(&self.channel_index_file(), lines)
  }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
  match std::fs::read_to_string(path) {
    Ok(content) => Ok(content.lines().map(str::to_string).collect()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
    Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
  }
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  let mut content = String::new();
  for line in lines {
    content.push_str(&line);
    content.push('\n');
  }
  std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// `id|||title|||channel_url|||channel_name`, each field escaped.
fn encode_item(item: &MediaItem) -> String {
  [
    esc(&item.id),
    esc(&item.title),
    esc(item.channel_id.as_deref().unwrap_or("")),
    esc(item.channel_name.as_deref().unwrap_or("")),
  ]
  .join(FIELD_DELIM)
}

/// Accepts the short `id|||title` form as well.
fn decode_item(line: &str) -> Option<MediaItem> {
  let mut parts = line.split(FIELD_DELIM).map(unesc);
  let id = parts.next().filter(|s| !s.is_empty())?;
  let title = parts.next()?;
  let channel_id = parts.next().filter(|s| !s.is_empty());
  let channel_name = parts.next().filter(|s| !s.is_empty());
  Some(MediaItem { id, title, source_path: None, channel_id, channel_name })
}

/// `Name | URL`; a line without `|` is used as both. `#` lines are comments.
fn parse_subscription(line: &str) -> Option<Channel> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return None;
  }
  match line.split_once('|') {
    Some((name, url)) => Some(Channel { name: name.trim().to_string(), url: url.trim().to_string() }),
    None => Some(Channel { name: line.to_string(), url: line.to_string() }),
  }
}

pub fn esc(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '\n' => out.push_str("\\n"),
      '|' => out.push_str("\\p"),
      _ => out.push(c),
    }
  }
  out
}

pub fn unesc(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut chars = s.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('p') => out.push('|'),
      Some(other) => out.push(other),
      None => out.push('\\'),
    }
  }
  out
}
