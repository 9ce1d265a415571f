//! Per-view capability table.
//!
//! Each `View` maps to one `Capabilities` entry describing which list it
//! shows and what back / select / download / channel / refresh do there.
//! `App` routes every list action through this table instead of branching
//! on the focused view inline.

use crate::nav::View;

/// Which list a view indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
  /// No selectable list (the Search view drives its own history cursor).
  None,
  History,
  Results,
  Downloads,
  Subscriptions,
  ChannelVideos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
  Focus(View),
  LeaveChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAction {
  Play,
  EnterSubscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshAction {
  /// Refetch the subscription under the cursor into the channel cache.
  PrefetchSubscription,
  /// Refetch the channel being shown.
  ReloadChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
  pub list: ListSource,
  pub on_back: Option<BackAction>,
  pub on_select: Option<SelectAction>,
  pub on_download: bool,
  pub on_channel: bool,
  pub on_refresh: Option<RefreshAction>,
}

const TABLE: [Capabilities; View::ALL.len()] = [
  // Home
  Capabilities {
    list: ListSource::History,
    on_back: None,
    on_select: Some(SelectAction::Play),
    on_download: true,
    on_channel: true,
    on_refresh: None,
  },
  // Search
  Capabilities {
    list: ListSource::None,
    on_back: None,
    on_select: None,
    on_download: false,
    on_channel: false,
    on_refresh: None,
  },
  // Results
  Capabilities {
    list: ListSource::Results,
    on_back: Some(BackAction::Focus(View::Search)),
    on_select: Some(SelectAction::Play),
    on_download: true,
    on_channel: true,
    on_refresh: None,
  },
  // Downloads
  Capabilities {
    list: ListSource::Downloads,
    on_back: Some(BackAction::Focus(View::Home)),
    on_select: Some(SelectAction::Play),
    on_download: true,
    on_channel: true,
    on_refresh: None,
  },
  // Subscriptions
  Capabilities {
    list: ListSource::Subscriptions,
    on_back: Some(BackAction::Focus(View::Home)),
    on_select: Some(SelectAction::EnterSubscription),
    on_download: false,
    on_channel: false,
    on_refresh: Some(RefreshAction::PrefetchSubscription),
  },
  // Channel
  Capabilities {
    list: ListSource::ChannelVideos,
    on_back: Some(BackAction::LeaveChannel),
    on_select: Some(SelectAction::Play),
    on_download: true,
    on_channel: false,
    on_refresh: Some(RefreshAction::ReloadChannel),
  },
];

impl View {
  pub fn capabilities(self) -> &'static Capabilities {
    &TABLE[self.index()]
  }

  /// Whether the view lists media items (as opposed to channels or nothing).
  pub fn has_media(self) -> bool {
    matches!(
      self.capabilities().list,
      ListSource::History | ListSource::Results | ListSource::Downloads | ListSource::ChannelVideos
    )
  }
}
