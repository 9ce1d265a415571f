use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ProviderError, SpawnError};
use crate::jobs::{Downloader, ProcessHandle};
use crate::media::{MediaItem, watch_url};

/// Returns candidate items for a free-text query or a channel/video URL.
pub trait SearchProvider: Send + Sync {
  fn fetch(&self, source: &str, limit: usize) -> BoxFuture<'static, Result<Vec<MediaItem>, ProviderError>>;
}

/// The yt-dlp print template used for all listing commands.
const PRINT_FORMAT: &str = "%(id)s|||%(title)s|||%(channel_url)s|||%(channel)s";

const FIELD_DELIM: &str = "|||";

/// Searches, lists channels and downloads through the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
  video_dir: PathBuf,
  format: String,
}

impl YtDlp {
  pub fn new(video_dir: PathBuf, format: String) -> Self {
    Self { video_dir, format }
  }
}

fn is_url(source: &str) -> bool {
  source.contains("youtube.com") || source.contains("youtu.be")
}

fn fetch_args(source: &str, limit: usize) -> Vec<String> {
  let mut args: Vec<String> =
    ["--no-warnings", "--ignore-errors", "--flat-playlist", "--print", PRINT_FORMAT].map(String::from).to_vec();
  if is_url(source) {
    args.extend(["-I".to_string(), format!("1:{limit}"), "--".to_string(), source.to_string()]);
  } else {
    args.extend(["--".to_string(), format!("ytsearch{limit}:{source}")]);
  }
  args
}

/// Parse a single `id|||title|||channel_url|||channel` line.
/// Missing trailing fields and yt-dlp's `NA` placeholder are left blank.
fn parse_line(line: &str) -> Option<MediaItem> {
  let parts: Vec<&str> = line.split(FIELD_DELIM).collect();
  if parts.len() < 2 {
    return None;
  }
  let id = parts[0].trim();
  if id.is_empty() {
    return None;
  }
  let opt = |idx: usize| -> Option<String> {
    parts.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty() && *s != "NA").map(|s| s.to_string())
  };
  Some(MediaItem {
    id: id.to_string(),
    title: opt(1).unwrap_or_default(),
    source_path: None,
    channel_id: opt(2),
    channel_name: opt(3),
  })
}

fn parse_output(stdout: &str) -> Vec<MediaItem> {
  stdout.lines().map(str::trim).filter(|l| !l.is_empty()).filter_map(parse_line).collect()
}

impl SearchProvider for YtDlp {
  fn fetch(&self, source: &str, limit: usize) -> BoxFuture<'static, Result<Vec<MediaItem>, ProviderError>> {
    let args = fetch_args(source, limit);
    async move {
      debug!(?args, "yt-dlp: fetch");
      let output = Command::new("yt-dlp")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
          if e.kind() == std::io::ErrorKind::NotFound { ProviderError::NotInstalled("yt-dlp") } else { e.into() }
        })?;

      let items = parse_output(&String::from_utf8_lossy(&output.stdout));
      // --ignore-errors exits non-zero on partial failures; only an empty
      // listing counts as a failed fetch.
      if items.is_empty() && !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("yt-dlp exited with an error");
        return Err(ProviderError::Failed(reason.trim().to_string()));
      }
      Ok::<_, ProviderError>(items)
    }
    .boxed()
  }
}

impl Downloader for YtDlp {
  fn spawn(&self, item: &MediaItem) -> Result<Box<dyn ProcessHandle>, SpawnError> {
    std::fs::create_dir_all(&self.video_dir).map_err(|e| SpawnError::from_io("yt-dlp", e))?;
    let template = self.video_dir.join("%(title)s%(id)s.%(ext)s");

    let mut cmd = std::process::Command::new("yt-dlp");
    cmd
      .args(["--no-warnings", "--quiet", "--restrict-filenames", "--merge-output-format", "mkv", "-f"])
      .arg(&self.format)
      .arg("-o")
      .arg(template)
      .arg("--")
      .arg(watch_url(&item.id))
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null());
    // Own process group, so terminal signals aimed at the UI leave downloads alone.
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    let child = Command::from(cmd).spawn().map_err(|e| SpawnError::from_io("yt-dlp", e))?;
    Ok(Box::new(child))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_line_full() {
    let item = parse_line("dQw4w9WgXcQ|||Never Gonna|||https://www.youtube.com/channel/UC1|||Rick").unwrap();
    assert_eq!(item.id, "dQw4w9WgXcQ");
    assert_eq!(item.title, "Never Gonna");
    assert_eq!(item.channel_id.as_deref(), Some("https://www.youtube.com/channel/UC1"));
    assert_eq!(item.channel_name.as_deref(), Some("Rick"));
  }

  #[test]
  fn parse_line_degraded() {
    let item = parse_line("abc|||Title|||NA|||NA").unwrap();
    assert_eq!(item.channel_id, None);
    assert_eq!(item.channel_name, None);

    let item = parse_line("abc|||").unwrap();
    assert_eq!(item.title, "");
    assert_eq!(item.label(), "abc");
  }

  #[test]
  fn parse_line_rejects_garbage() {
    assert!(parse_line("ERROR: something").is_none());
    assert!(parse_line("|||title").is_none());
  }

  #[test]
  fn parse_output_skips_blank_and_bad_lines() {
    let out = "a|||A|||NA|||NA\n\nWARNING: noise\nb|||B|||https://c|||C\n";
    let ids: Vec<String> = parse_output(out).into_iter().map(|i| i.id).collect();
    assert_eq!(ids, ["a", "b"]);
  }

  #[test]
  fn fetch_args_for_query_and_url() {
    let args = fetch_args("lofi beats", 20);
    assert_eq!(args.last().map(String::as_str), Some("ytsearch20:lofi beats"));

    let args = fetch_args("https://www.youtube.com/@chan/videos", 40);
    let tail: Vec<&str> = args.iter().rev().take(4).rev().map(String::as_str).collect();
    assert_eq!(tail, ["-I", "1:40", "--", "https://www.youtube.com/@chan/videos"]);
  }
}
