//! Local content cache: what media is available on disk, merged with
//! downloads that are still in flight.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::constants;
use crate::jobs::DownloadJob;
use crate::media::MediaItem;
use crate::nav::char_to_byte_index;

/// The directory completed downloads land in.
#[derive(Debug, Clone)]
pub struct VideoDir {
  root: PathBuf,
}

impl VideoDir {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn ensure(&self) -> Result<()> {
    std::fs::create_dir_all(&self.root)
      .with_context(|| format!("Failed to create video directory {}", self.root.display()))
  }

  /// List cached videos in directory order. A missing or unreadable
  /// directory yields an empty list.
  pub fn scan(&self) -> Vec<MediaItem> {
    let entries = match std::fs::read_dir(&self.root) {
      Ok(entries) => entries,
      Err(e) => {
        if e.kind() != std::io::ErrorKind::NotFound {
          warn!(dir = %self.root.display(), err = %e, "cache: failed to read video directory");
        }
        return Vec::new();
      }
    };

    let items: Vec<MediaItem> = entries
      .flatten()
      .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
      .filter_map(|entry| parse_cached_file(&entry.path()))
      .collect();
    debug!(count = items.len(), "cache: scanned video directory");
    items
  }

  pub fn find_path_by_id(&self, id: &str) -> Option<PathBuf> {
    self.scan().into_iter().find(|item| item.id == id).and_then(|item| item.source_path)
  }
}

/// Parse `<title><id>.<ext>` into a MediaItem.
fn parse_cached_file(path: &Path) -> Option<MediaItem> {
  let ext = path.extension()?.to_str()?;
  if !constants().video_extensions.iter().any(|e| e == ext) {
    return None;
  }
  let stem = path.file_stem()?.to_str()?;
  if is_format_fragment(stem) {
    return None;
  }

  let id_len = constants().id_length;
  let chars = stem.chars().count();
  let (title, id) = if chars >= id_len {
    stem.split_at(char_to_byte_index(stem, chars - id_len))
  } else {
    (stem, stem)
  };
  Some(MediaItem {
    id: id.to_string(),
    title: title.to_string(),
    source_path: Some(path.to_path_buf()),
    channel_id: None,
    channel_name: None,
  })
}

/// yt-dlp writes per-format parts as `<stem>.f<digits>.<ext>` before merging.
fn is_format_fragment(stem: &str) -> bool {
  stem
    .rsplit_once('.')
    .and_then(|(_, suffix)| suffix.strip_prefix('f'))
    .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Channel association recorded for an item id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMeta {
  pub url: String,
  pub name: Option<String>,
}

/// Small id -> channel lookup used to fill in channel fields of disk items.
#[derive(Debug, Clone, Default)]
pub struct ChannelIndex {
  entries: HashMap<String, ChannelMeta>,
}

impl ChannelIndex {
  pub fn from_entries(entries: impl IntoIterator<Item = (String, ChannelMeta)>) -> Self {
    Self { entries: entries.into_iter().collect() }
  }

  pub fn get(&self, id: &str) -> Option<&ChannelMeta> {
    self.entries.get(id)
  }

  /// Record the item's channel if it has one. Returns whether anything changed.
  pub fn remember(&mut self, item: &MediaItem) -> bool {
    let Some(channel) = item.channel() else { return false };
    let meta = ChannelMeta { url: channel.url, name: channel.name };
    if self.entries.get(&item.id) == Some(&meta) {
      return false;
    }
    self.entries.insert(item.id.clone(), meta);
    true
  }

  /// Entries sorted by id, for stable persistence.
  pub fn sorted(&self) -> Vec<(&str, &ChannelMeta)> {
    let mut out: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
    out.sort_by(|a, b| a.0.cmp(b.0));
    out
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

/// Merge the disk scan with in-flight downloads into one list.
///
/// Disk items keep scan order and win over a job with the same id; jobs
/// whose id is not on disk yet are appended in job order. The output never
/// contains two entries with the same id. Disk items without channel fields
/// are filled from `index` when it knows them.
pub fn reconcile(disk_items: &[MediaItem], active_jobs: &[DownloadJob], index: &ChannelIndex) -> Vec<MediaItem> {
  let mut seen: HashSet<&str> = HashSet::with_capacity(disk_items.len() + active_jobs.len());
  let mut out = Vec::with_capacity(disk_items.len() + active_jobs.len());

  for item in disk_items {
    if !seen.insert(item.id.as_str()) {
      continue;
    }
    let mut item = item.clone();
    if item.channel_id.is_none()
      && let Some(meta) = index.get(&item.id)
    {
      item.channel_id = Some(meta.url.clone());
      item.channel_name = meta.name.clone();
    }
    out.push(item);
  }

  for job in active_jobs {
    if seen.insert(job.item.id.as_str()) {
      out.push(job.item.clone());
    }
  }
  out
}
