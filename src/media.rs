use std::path::PathBuf;

/// A single piece of remote or cached media.
///
/// Identity is the `id` alone: two items with the same id are the same media
/// whatever their other fields say.
#[derive(Debug, Clone, Default)]
pub struct MediaItem {
  pub id: String,
  pub title: String,
  pub source_path: Option<PathBuf>,
  pub channel_id: Option<String>,
  pub channel_name: Option<String>,
}

impl PartialEq for MediaItem {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for MediaItem {}

impl MediaItem {
  pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
    Self { id: id.into(), title: title.into(), ..Self::default() }
  }

  pub fn with_channel(mut self, url: impl Into<String>, name: Option<String>) -> Self {
    self.channel_id = Some(url.into());
    self.channel_name = name;
    self
  }

  /// Title for display; degraded items fall back to their id.
  pub fn label(&self) -> &str {
    if self.title.is_empty() { &self.id } else { &self.title }
  }

  pub fn channel(&self) -> Option<ChannelRef> {
    let url = self.channel_id.as_deref().filter(|u| !u.is_empty())?;
    Some(ChannelRef { url: url.to_string(), name: self.channel_name.clone().filter(|n| !n.is_empty()) })
  }
}

/// A resolvable reference to a channel's video listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
  pub url: String,
  pub name: Option<String>,
}

impl ChannelRef {
  pub fn label(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.url)
  }
}

/// A subscription entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
  pub name: String,
  pub url: String,
}

impl Channel {
  pub fn label(&self) -> &str {
    if self.name.is_empty() { &self.url } else { &self.name }
  }

  pub fn to_ref(&self) -> ChannelRef {
    ChannelRef { url: self.url.clone(), name: Some(self.name.clone()).filter(|n| !n.is_empty()) }
  }
}

pub fn watch_url(id: &str) -> String {
  format!("https://www.youtube.com/watch?v={}", id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identity_is_id_only() {
    let a = MediaItem::new("abc", "First title");
    let b = MediaItem { source_path: Some("/tmp/x.mkv".into()), ..MediaItem::new("abc", "Other") };
    assert_eq!(a, b);
    assert_ne!(a, MediaItem::new("abd", "First title"));
  }

  #[test]
  fn label_falls_back_to_id() {
    assert_eq!(MediaItem::new("abc", "").label(), "abc");
    assert_eq!(MediaItem::new("abc", "Title").label(), "Title");
  }

  #[test]
  fn channel_requires_non_empty_url() {
    assert!(MediaItem::new("a", "t").channel().is_none());
    let item = MediaItem::new("a", "t").with_channel("", None);
    assert!(item.channel().is_none());
    let item = MediaItem::new("a", "t").with_channel("https://www.youtube.com/@x", Some(String::new()));
    let ch = item.channel().unwrap();
    assert_eq!(ch.url, "https://www.youtube.com/@x");
    assert_eq!(ch.name, None);
    assert_eq!(ch.label(), "https://www.youtube.com/@x");
  }
}
