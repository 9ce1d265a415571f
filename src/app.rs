use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::{ChannelIndex, VideoDir, reconcile};
use crate::constants::constants;
use crate::error::{ProviderError, ResolutionFailure};
use crate::jobs::{Downloader, JobSupervisor};
use crate::media::{Channel, ChannelRef, MediaItem, watch_url};
use crate::nav::{EditMode, NavigationContext, SearchHistory, View};
use crate::player::Player;
use crate::store::Store;
use crate::views::{BackAction, ListSource, RefreshAction, SelectAction};
use crate::youtube::SearchProvider;

// --- Types ---

type FetchResult = Result<Vec<MediaItem>, ProviderError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
  pub text: String,
  pub is_error: bool,
  set_at: Instant,
}

/// What a channel fetch was dispatched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelPurpose {
  /// Entering a channel that was not cached.
  Show,
  /// Explicit refresh of the channel being shown.
  Reload,
  /// Refresh of a subscription from the Subscriptions view.
  Prefetch,
}

struct SearchRequest {
  query: String,
  generation: u64,
  rx: oneshot::Receiver<FetchResult>,
}

struct ChannelRequest {
  channel: ChannelRef,
  purpose: ChannelPurpose,
  generation: u64,
  rx: oneshot::Receiver<FetchResult>,
}

struct ResolveRequest {
  item: MediaItem,
  generation: u64,
  rx: oneshot::Receiver<FetchResult>,
}

/// Contents of the Channel view.
#[derive(Debug, Clone)]
pub struct ChannelView {
  pub channel: ChannelRef,
  pub videos: Vec<MediaItem>,
  pub loading: bool,
}

// --- App State ---

pub struct App {
  pub nav: NavigationContext,
  pub search_history: SearchHistory,
  /// Play history, most recent first.
  pub history: Vec<MediaItem>,
  pub results: Vec<MediaItem>,
  pub subscriptions: Vec<Channel>,
  pub channel: Option<ChannelView>,
  pub status: Option<StatusLine>,
  pub should_quit: bool,
  channel_cache: HashMap<String, Vec<MediaItem>>,
  channel_index: ChannelIndex,
  video_dir: VideoDir,
  disk_ids: HashSet<String>,
  disk_items: Vec<MediaItem>,
  /// Reconciled Downloads list; recomputed on rescan and job changes only.
  downloads: Vec<MediaItem>,
  last_scan: Option<Instant>,
  jobs: JobSupervisor,
  provider: Arc<dyn SearchProvider>,
  player: Box<dyn Player>,
  store: Option<Store>,
  search_limit: usize,
  pending_search: Option<SearchRequest>,
  pending_channels: Vec<ChannelRequest>,
  pending_resolve: Option<ResolveRequest>,
}

impl App {
  pub fn new(
    provider: Arc<dyn SearchProvider>,
    downloader: Box<dyn Downloader>,
    player: Box<dyn Player>,
    video_dir: VideoDir,
    search_limit: usize,
  ) -> Self {
    let mut app = Self {
      nav: NavigationContext::new(),
      search_history: SearchHistory::new(constants().search_history_cap),
      history: Vec::new(),
      results: Vec::new(),
      subscriptions: Vec::new(),
      channel: None,
      status: None,
      should_quit: false,
      channel_cache: HashMap::new(),
      channel_index: ChannelIndex::default(),
      video_dir,
      disk_ids: HashSet::new(),
      disk_items: Vec::new(),
      downloads: Vec::new(),
      last_scan: None,
      jobs: JobSupervisor::new(downloader),
      provider,
      player,
      store: None,
      search_limit,
      pending_search: None,
      pending_channels: Vec::new(),
      pending_resolve: None,
    };
    app.rescan_downloads();
    app
  }

  /// Load persisted state and keep `store` for later saves. Unreadable
  /// files are logged and treated as empty.
  pub fn load(&mut self, store: Store) {
    self.history = loaded("history", store.load_history());
    self.search_history =
      SearchHistory::from_entries(loaded("search history", store.load_search_history()), constants().search_history_cap);
    self.subscriptions = loaded("subscriptions", store.load_subscriptions());
    self.channel_cache = loaded("channel cache", store.load_channel_cache());
    self.channel_index = loaded("channel index", store.load_channel_index());
    info!(
      history = self.history.len(),
      searches = self.search_history.len(),
      subscriptions = self.subscriptions.len(),
      channels = self.channel_cache.len(),
      indexed = self.channel_index.len(),
      "app: state loaded"
    );
    self.store = Some(store);
    self.rescan_downloads();
  }

  // --- Status line ---

  pub fn set_status(&mut self, text: impl Into<String>) {
    self.status = Some(StatusLine { text: text.into(), is_error: false, set_at: Instant::now() });
  }

  pub fn set_error(&mut self, text: impl Into<String>) {
    self.status = Some(StatusLine { text: text.into(), is_error: true, set_at: Instant::now() });
  }

  pub fn clear_status(&mut self) {
    self.status = None;
  }

  pub fn expire_status(&mut self) {
    if let Some(status) = &self.status
      && status.set_at.elapsed() >= constants().status_lifetime()
    {
      self.status = None;
    }
  }

  // --- Tick ---

  /// One loop iteration's worth of background bookkeeping. Never blocks.
  pub fn tick(&mut self) {
    self.expire_status();

    let finished = self.jobs.poll_and_reap();
    if !finished.is_empty() {
      self.rescan_downloads();
      if let Some(job) = finished.last() {
        if self.disk_ids.contains(&job.item.id) {
          self.set_status(format!("Downloaded: {}", job.item.label()));
        } else {
          self.set_error(format!("Download ended without a file: {}", job.item.label()));
        }
      }
    }

    self.check_pending();

    if self.nav.focus() == View::Downloads
      && self.last_scan.is_none_or(|t| t.elapsed() >= constants().rescan_interval())
    {
      self.rescan_downloads();
    }
  }

  /// Apply any provider responses that have arrived.
  pub fn check_pending(&mut self) {
    if let Some(mut req) = self.pending_search.take() {
      match try_take(&mut req.rx) {
        Some(result) => self.finish_search(req, result),
        None => self.pending_search = Some(req),
      }
    }

    if !self.pending_channels.is_empty() {
      let mut done = Vec::new();
      for mut req in std::mem::take(&mut self.pending_channels) {
        match try_take(&mut req.rx) {
          Some(result) => done.push((req, result)),
          None => self.pending_channels.push(req),
        }
      }
      for (req, result) in done {
        self.finish_channel(req, result);
      }
    }

    if let Some(mut req) = self.pending_resolve.take() {
      match try_take(&mut req.rx) {
        Some(result) => self.finish_resolve(req, result),
        None => self.pending_resolve = Some(req),
      }
    }
  }

  pub fn is_busy(&self) -> bool {
    self.pending_search.is_some() || self.pending_resolve.is_some() || !self.pending_channels.is_empty()
  }

  // --- Lists ---

  pub fn list_len(&self, view: View) -> usize {
    match view.capabilities().list {
      ListSource::None => 0,
      ListSource::Subscriptions => self.subscriptions.len(),
      _ => self.media_list(view).len(),
    }
  }

  /// The media items a view shows. Empty for views without media.
  pub fn media_list(&self, view: View) -> &[MediaItem] {
    match view.capabilities().list {
      ListSource::History => &self.history,
      ListSource::Results => &self.results,
      ListSource::Downloads => &self.downloads,
      ListSource::ChannelVideos => self.channel.as_ref().map_or(&[], |c| &c.videos),
      ListSource::None | ListSource::Subscriptions => &[],
    }
  }

  /// Search-history entries listed under the query box.
  pub fn recent_searches(&self) -> &[String] {
    let entries = self.search_history.entries();
    &entries[..entries.len().min(constants().recent_searches_shown)]
  }

  fn selected_item(&self) -> Option<MediaItem> {
    self.media_list(self.nav.focus()).get(self.nav.selection()).cloned()
  }

  pub fn is_downloaded(&self, id: &str) -> bool {
    self.disk_ids.contains(id)
  }

  pub fn is_downloading(&self, id: &str) -> bool {
    self.jobs.is_downloading(id)
  }

  /// Files found by the last scan and downloads still running.
  pub fn download_counts(&self) -> (usize, usize) {
    (self.disk_items.len(), self.jobs.active_count())
  }

  // --- Navigation ---

  pub fn focus(&mut self, view: View) {
    if view == View::Channel {
      return;
    }
    self.nav.focus_switch(view);
    self.channel = None;
    if view == View::Downloads {
      self.rescan_downloads();
    }
  }

  pub fn move_selection(&mut self, delta: isize) {
    let focus = self.nav.focus();
    if focus == View::Search {
      let len = self.recent_searches().len();
      for step in 0..delta.unsigned_abs() {
        if delta > 0 {
          self.nav.history_next(len);
        } else if step > 0 && matches!(self.nav.history_cursor(), Some(0) | None) {
          // Paging up stops at the top instead of wrapping to the last entry.
          break;
        } else {
          self.nav.history_prev(len);
        }
      }
      return;
    }
    let len = self.list_len(focus);
    self.nav.move_selection(delta, len);
  }

  pub fn go_back(&mut self) {
    match self.nav.focus().capabilities().on_back {
      Some(BackAction::Focus(view)) => self.focus(view),
      Some(BackAction::LeaveChannel) => self.leave_channel(),
      None => {}
    }
  }

  fn leave_channel(&mut self) {
    let lens = View::ALL.map(|v| self.list_len(v));
    if let Some(frame) = self.nav.leave_channel(|v| lens[v.index()]) {
      self.channel = None;
      if frame.view == View::Downloads {
        self.rescan_downloads();
        let len = self.downloads.len();
        self.nav.clamp_selection(len);
      }
    }
  }

  /// Confirm on the focused view: play, open a subscription, or drive the
  /// search box.
  pub fn select(&mut self) {
    let focus = self.nav.focus();
    if focus == View::Search {
      self.confirm_search();
      return;
    }
    match focus.capabilities().on_select {
      Some(SelectAction::Play) => {
        if let Some(item) = self.selected_item() {
          self.play(item);
        }
      }
      Some(SelectAction::EnterSubscription) => {
        if let Some(sub) = self.subscriptions.get(self.nav.selection()) {
          let channel = sub.to_ref();
          self.enter_channel(channel);
        }
      }
      None => {}
    }
  }

  // --- Search ---

  fn confirm_search(&mut self) {
    match self.nav.edit_mode() {
      EditMode::Normal => match self.nav.history_cursor() {
        Some(i) => {
          if self.nav.select_history_entry(i, &self.search_history) {
            self.submit_query();
          }
        }
        None => self.nav.enter_insert(),
      },
      EditMode::Insert => self.submit_query(),
    }
  }

  /// Dispatch a search for the current query. An empty query only leaves
  /// insert mode.
  pub fn submit_query(&mut self) {
    let query = self.nav.query().trim().to_string();
    if query.is_empty() {
      self.nav.exit_insert();
      return;
    }
    info!(query = %query, "search triggered");
    self.search_history.record(&query);
    self.save_search_history();

    let rx = self.spawn_fetch(query.clone(), self.search_limit);
    // A newer search replaces the pending one; its response is dropped.
    self.pending_search = Some(SearchRequest { query: query.clone(), generation: self.nav.generation(), rx });
    self.set_status(format!("Searching '{}'…", query));
  }

  fn finish_search(&mut self, req: SearchRequest, result: FetchResult) {
    if req.generation != self.nav.generation() {
      debug!(query = %req.query, "search: discarding stale response");
      return;
    }
    match result {
      Ok(items) => {
        info!(query = %req.query, count = items.len(), "search: results");
        self.results = items;
        self.nav.focus_switch(View::Results);
        if self.results.is_empty() {
          self.set_status("No results found.");
        } else {
          self.clear_status();
        }
      }
      Err(e) => {
        warn!(query = %req.query, err = %e, "search failed");
        self.set_error(format!("Search failed: {}", e));
      }
    }
  }

  // --- Channels ---

  /// Open the channel of the selected item, resolving it first if needed.
  pub fn open_channel(&mut self) {
    if !self.nav.focus().capabilities().on_channel {
      return;
    }
    let Some(item) = self.selected_item() else { return };
    if let Some(channel) = self.known_channel(&item) {
      self.enter_channel(channel);
      return;
    }
    if item.id.is_empty() {
      self.set_error(format!("Channel unavailable: {}", ResolutionFailure));
      return;
    }
    info!(id = %item.id, "channel: resolving");
    let rx = self.spawn_fetch(watch_url(&item.id), 1);
    self.pending_resolve = Some(ResolveRequest { item, generation: self.nav.generation(), rx });
    self.set_status("Looking up channel…");
  }

  fn known_channel(&self, item: &MediaItem) -> Option<ChannelRef> {
    item
      .channel()
      .or_else(|| self.channel_index.get(&item.id).map(|m| ChannelRef { url: m.url.clone(), name: m.name.clone() }))
  }

  fn finish_resolve(&mut self, req: ResolveRequest, result: FetchResult) {
    let channel = match result {
      Ok(items) => items.iter().find_map(MediaItem::channel),
      Err(e) => {
        warn!(id = %req.item.id, err = %e, "channel: resolution failed");
        self.set_error(format!("Channel unavailable: {}", e));
        return;
      }
    };
    let Some(channel) = channel else {
      self.set_error(format!("Channel unavailable: {}", ResolutionFailure));
      return;
    };

    let resolved = req.item.clone().with_channel(channel.url.clone(), channel.name.clone());
    if self.channel_index.remember(&resolved) {
      self.save_channel_index();
    }
    if req.generation != self.nav.generation() {
      debug!(id = %req.item.id, "channel: discarding stale resolution");
      return;
    }
    self.clear_status();
    self.enter_channel(channel);
  }

  /// Show `channel`, from the per-channel cache when present.
  fn enter_channel(&mut self, channel: ChannelRef) {
    info!(url = %channel.url, "channel: entering");
    self.nav.enter_channel();
    if let Some(videos) = self.channel_cache.get(&channel.url) {
      self.channel = Some(ChannelView { channel, videos: videos.clone(), loading: false });
      return;
    }
    self.dispatch_channel(channel.clone(), ChannelPurpose::Show);
    self.channel = Some(ChannelView { channel, videos: Vec::new(), loading: true });
  }

  fn dispatch_channel(&mut self, channel: ChannelRef, purpose: ChannelPurpose) {
    debug!(url = %channel.url, ?purpose, "channel: fetch dispatched");
    let rx = self.spawn_fetch(channel.url.clone(), constants().list_limit);
    self.pending_channels.push(ChannelRequest { channel, purpose, generation: self.nav.generation(), rx });
  }

  fn finish_channel(&mut self, req: ChannelRequest, result: FetchResult) {
    let url = req.channel.url.clone();
    let showing = req.generation == self.nav.generation()
      && self.nav.focus() == View::Channel
      && self.channel.as_ref().is_some_and(|c| c.channel.url == url);

    let videos = match result {
      Ok(videos) => tag_with_channel(videos, &req.channel),
      Err(e) => {
        warn!(url = %url, err = %e, "channel: fetch failed");
        if showing && let Some(view) = &mut self.channel {
          view.loading = false;
        }
        self.set_error(format!("Channel fetch failed: {}", e));
        return;
      }
    };

    // The cache is keyed by URL, not by what is on screen.
    self.channel_cache.insert(url.clone(), videos.clone());
    self.save_channel_cache();

    if req.purpose == ChannelPurpose::Prefetch {
      self.set_status(format!("Prefetched channel: {}", req.channel.label()));
      return;
    }
    if !showing {
      debug!(url = %url, "channel: discarding stale listing");
      return;
    }
    let empty = videos.is_empty();
    if let Some(view) = &mut self.channel {
      view.videos = videos;
      view.loading = false;
    }
    match req.purpose {
      ChannelPurpose::Reload => {
        let len = self.list_len(View::Channel);
        self.nav.select(0, len);
        self.set_status(if empty { "No videos found for channel" } else { "Refreshed channel" });
      }
      _ if empty => self.set_status("No videos found for channel"),
      _ => {}
    }
  }

  pub fn refresh(&mut self) {
    match self.nav.focus().capabilities().on_refresh {
      Some(RefreshAction::PrefetchSubscription) => {
        let Some(sub) = self.subscriptions.get(self.nav.selection()) else { return };
        let channel = sub.to_ref();
        self.set_status(format!("Prefetching channel: {}", channel.label()));
        self.dispatch_channel(channel, ChannelPurpose::Prefetch);
      }
      Some(RefreshAction::ReloadChannel) => {
        let Some(view) = &mut self.channel else { return };
        view.loading = true;
        let channel = view.channel.clone();
        self.dispatch_channel(channel, ChannelPurpose::Reload);
      }
      None => {}
    }
  }

  /// Subscribe to or unsubscribe from the channel being shown.
  pub fn toggle_subscription(&mut self) {
    if self.nav.focus() != View::Channel {
      return;
    }
    let Some(view) = &self.channel else { return };
    let channel = view.channel.clone();
    match self.subscription_position(&channel) {
      Some(pos) => {
        let removed = self.subscriptions.remove(pos);
        info!(url = %removed.url, "subscriptions: removed");
        self.set_status(format!("Unsubscribed: {}", removed.label()));
      }
      None => {
        let sub = Channel { name: channel.label().to_string(), url: channel.url.clone() };
        info!(url = %sub.url, "subscriptions: added");
        self.set_status(format!("Subscribed: {}", sub.label()));
        self.subscriptions.push(sub);
      }
    }
    self.save_subscriptions();
  }

  pub fn is_subscribed(&self, channel: &ChannelRef) -> bool {
    self.subscription_position(channel).is_some()
  }

  /// Subscriptions match by URL or, failing that, by channel name.
  fn subscription_position(&self, channel: &ChannelRef) -> Option<usize> {
    self
      .subscriptions
      .iter()
      .position(|s| s.url == channel.url || channel.name.as_deref().is_some_and(|n| n == s.name))
  }

  // --- Playback and downloads ---

  fn play(&mut self, item: MediaItem) {
    let target = self
      .video_dir
      .find_path_by_id(&item.id)
      .and_then(|p| p.to_str().map(str::to_string))
      .unwrap_or_else(|| watch_url(&item.id));
    info!(id = %item.id, via = %target, "play");
    if let Err(e) = self.player.play(&target) {
      warn!(err = %e, "play failed");
      self.set_error(format!("Playback failed: {}", e));
      return;
    }
    self.set_status(format!("Playing: {}", item.label()));
    if self.channel_index.remember(&item) {
      self.save_channel_index();
    }
    self.history.retain(|h| h.id != item.id);
    self.history.insert(0, MediaItem { source_path: None, ..item });
    self.save_history();
  }

  pub fn download_selected(&mut self) {
    if !self.nav.focus().capabilities().on_download {
      return;
    }
    let Some(item) = self.selected_item() else { return };
    let label = item.label().to_string();
    let remembered = self.channel_index.remember(&item);
    match self.jobs.enqueue(MediaItem { source_path: None, ..item }) {
      Ok(_) => {
        self.set_status(format!("Downloading: {}", label));
        self.refresh_downloads();
      }
      Err(e) => {
        warn!(err = %e, "download failed to start");
        self.set_error(format!("Download failed: {}", e));
      }
    }
    if remembered {
      self.save_channel_index();
    }
  }

  /// Rescan the video directory and rebuild the Downloads list.
  pub fn rescan_downloads(&mut self) {
    self.disk_items = self.video_dir.scan();
    self.disk_ids = self.disk_items.iter().map(|i| i.id.clone()).collect();
    self.last_scan = Some(Instant::now());
    self.refresh_downloads();
  }

  fn refresh_downloads(&mut self) {
    self.downloads = reconcile(&self.disk_items, self.jobs.jobs(), &self.channel_index);
  }

  fn spawn_fetch(&self, source: String, limit: usize) -> oneshot::Receiver<FetchResult> {
    let (tx, rx) = oneshot::channel();
    let fetch = self.provider.fetch(&source, limit);
    tokio::spawn(async move {
      let _ = tx.send(fetch.await);
    });
    rx
  }

  // --- Persistence ---

  fn save_history(&mut self) {
    let Some(store) = &self.store else { return };
    let result = store.save_history(&self.history);
    self.report_save("history", result);
  }

  fn save_search_history(&mut self) {
    let Some(store) = &self.store else { return };
    let result = store.save_search_history(self.search_history.entries());
    self.report_save("search history", result);
  }

  fn save_subscriptions(&mut self) {
    let Some(store) = &self.store else { return };
    let result = store.save_subscriptions(&self.subscriptions);
    self.report_save("subscriptions", result);
  }

  fn save_channel_cache(&mut self) {
    let Some(store) = &self.store else { return };
    let result = store.save_channel_cache(&self.channel_cache);
    self.report_save("channel cache", result);
  }

  fn save_channel_index(&mut self) {
    let Some(store) = &self.store else { return };
    let result = store.save_channel_index(&self.channel_index);
    self.report_save("channel index", result);
  }

  fn report_save(&mut self, what: &str, result: Result<()>) {
    if let Err(e) = result {
      warn!(what, err = %format!("{:#}", e), "store: save failed");
      self.set_error(format!("Could not save {}: {:#}", what, e));
    }
  }
}

fn loaded<T: Default>(what: &str, result: Result<T>) -> T {
  result.unwrap_or_else(|e| {
    warn!(what, err = %format!("{:#}", e), "store: load failed, starting empty");
    T::default()
  })
}

fn try_take(rx: &mut oneshot::Receiver<FetchResult>) -> Option<FetchResult> {
  match rx.try_recv() {
    Ok(result) => Some(result),
    Err(oneshot::error::TryRecvError::Empty) => None,
    Err(oneshot::error::TryRecvError::Closed) => Some(Err(ProviderError::Cancelled)),
  }
}

/// Channel listings often omit the uploader; fill it from the channel asked for.
fn tag_with_channel(mut videos: Vec<MediaItem>, channel: &ChannelRef) -> Vec<MediaItem> {
  for video in &mut videos {
    if video.channel().is_none() {
      video.channel_id = Some(channel.url.clone());
      video.channel_name = channel.name.clone();
    }
  }
  videos
}
