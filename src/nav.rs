//! Focus, selection, scroll and query-edit state.
//!
//! `NavigationContext` is created once at startup and only ever mutated
//! through the transitions below. It knows nothing about the lists it
//! indexes into: callers pass list lengths, so every transition can clamp.

use tracing::debug;

/// The single active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
  Home,
  Search,
  Results,
  Downloads,
  Subscriptions,
  Channel,
}

impl View {
  pub const ALL: [View; 6] =
    [View::Home, View::Search, View::Results, View::Downloads, View::Subscriptions, View::Channel];

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn label(self) -> &'static str {
    match self {
      View::Home => "History",
      View::Search => "Search",
      View::Results => "Results",
      View::Downloads => "Downloads",
      View::Subscriptions => "Subscriptions",
      View::Channel => "Channel",
    }
  }
}

/// Sub-state of the Search view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
  /// Navigating the search-history list.
  #[default]
  Normal,
  /// Editing the query text.
  Insert,
}

/// Where to go back to when leaving a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnFrame {
  pub view: View,
  pub selection: usize,
}

impl ReturnFrame {
  /// Used when a channel was entered without an origin (e.g. a deep link).
  pub const DEFAULT: ReturnFrame = ReturnFrame { view: View::Subscriptions, selection: 0 };
}

#[derive(Debug, Clone)]
pub struct NavigationContext {
  focus: View,
  selection: usize,
  scroll: [usize; View::ALL.len()],
  query: String,
  /// Cursor position within `query` (char index).
  cursor: usize,
  edit_mode: EditMode,
  history_cursor: Option<usize>,
  return_frame: Option<ReturnFrame>,
  /// Bumped on every focus change; async responses tagged with an older
  /// value must not touch navigation state.
  generation: u64,
}

impl Default for NavigationContext {
  fn default() -> Self {
    Self::new()
  }
}

impl NavigationContext {
  pub fn new() -> Self {
    Self {
      focus: View::Home,
      selection: 0,
      scroll: [0; View::ALL.len()],
      query: String::new(),
      cursor: 0,
      edit_mode: EditMode::Normal,
      history_cursor: None,
      return_frame: None,
      generation: 0,
    }
  }

  // --- Accessors ---

  pub fn focus(&self) -> View {
    self.focus
  }

  pub fn selection(&self) -> usize {
    self.selection
  }

  pub fn scroll(&self, view: View) -> usize {
    self.scroll[view.index()]
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn edit_mode(&self) -> EditMode {
    self.edit_mode
  }

  pub fn is_inserting(&self) -> bool {
    self.focus == View::Search && self.edit_mode == EditMode::Insert
  }

  pub fn history_cursor(&self) -> Option<usize> {
    self.history_cursor
  }

  pub fn return_frame(&self) -> Option<ReturnFrame> {
    self.return_frame
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  // --- Focus transitions ---

  pub fn focus_switch(&mut self, target: View) {
    debug!(from = ?self.focus, to = ?target, "nav: focus switch");
    self.focus = target;
    self.selection = 0;
    self.scroll[target.index()] = 0;
    self.reset_edit_state();
    if target != View::Channel {
      self.return_frame = None;
    }
    self.generation += 1;
  }

  /// Enter the Channel view. The return frame is only recorded on the first
  /// entry from a non-channel view; nested entries keep the original origin.
  pub fn enter_channel(&mut self) {
    if self.focus != View::Channel && self.return_frame.is_none() {
      self.return_frame = Some(ReturnFrame { view: self.focus, selection: self.selection });
    }
    debug!(origin = ?self.return_frame, "nav: enter channel");
    self.focus = View::Channel;
    self.selection = 0;
    self.scroll[View::Channel.index()] = 0;
    self.reset_edit_state();
    self.generation += 1;
  }

  /// Leave the Channel view, restoring the saved origin (or Subscriptions).
  /// The frame is cleared unconditionally. Returns `None` outside Channel.
  pub fn leave_channel(&mut self, len_of: impl Fn(View) -> usize) -> Option<ReturnFrame> {
    if self.focus != View::Channel {
      return None;
    }
    let frame = self.return_frame.take().unwrap_or(ReturnFrame::DEFAULT);
    self.focus = frame.view;
    self.selection = clamp_index(frame.selection, len_of(frame.view));
    self.reset_edit_state();
    self.generation += 1;
    debug!(?frame, selection = self.selection, "nav: leave channel");
    Some(frame)
  }

  // --- Selection and scroll ---

  /// Move the selection by `delta`, clamped to `[0, len - 1]` without
  /// wrapping. Returns whether the selection changed.
  pub fn move_selection(&mut self, delta: isize, len: usize) -> bool {
    if len == 0 {
      self.selection = 0;
      return false;
    }
    let current = self.selection.min(len - 1);
    let next = current.saturating_add_signed(delta).min(len - 1);
    let changed = next != self.selection;
    self.selection = next;
    changed
  }

  pub fn select(&mut self, index: usize, len: usize) {
    self.selection = clamp_index(index, len);
  }

  pub fn clamp_selection(&mut self, len: usize) {
    self.selection = clamp_index(self.selection, len);
  }

  /// Clamp the selection and recompute the focused view's scroll offset so
  /// the selection is visible and the offset never exceeds
  /// `len - visible_rows`.
  pub fn fit_to_list(&mut self, len: usize, visible_rows: usize) -> usize {
    self.clamp_selection(len);
    let selection = self.selection;
    let slot = &mut self.scroll[self.focus.index()];
    if visible_rows == 0 || len <= visible_rows {
      *slot = 0;
      return 0;
    }
    if selection < *slot {
      *slot = selection;
    } else if selection >= *slot + visible_rows {
      *slot = selection + 1 - visible_rows;
    }
    *slot = (*slot).min(len - visible_rows);
    *slot
  }

  // --- Search sub-states ---

  /// Normal <-> Insert. Only valid in Search.
  pub fn toggle_edit_mode(&mut self) -> bool {
    if self.focus != View::Search {
      return false;
    }
    self.edit_mode = match self.edit_mode {
      EditMode::Normal => EditMode::Insert,
      EditMode::Insert => EditMode::Normal,
    };
    self.history_cursor = None;
    self.cursor = self.query.chars().count();
    true
  }

  pub fn enter_insert(&mut self) {
    if self.focus == View::Search && self.edit_mode == EditMode::Normal {
      self.toggle_edit_mode();
    }
  }

  pub fn exit_insert(&mut self) {
    if self.edit_mode == EditMode::Insert {
      self.reset_edit_state();
    }
  }

  /// Down in the search-history list: none -> 0 -> ... -> last.
  pub fn history_next(&mut self, len: usize) {
    if !self.in_history_list() || len == 0 {
      return;
    }
    self.history_cursor = match self.history_cursor {
      None => Some(0),
      Some(i) => Some((i + 1).min(len - 1)),
    };
  }

  /// Up in the search-history list: i -> i - 1, 0 -> none, none -> last.
  pub fn history_prev(&mut self, len: usize) {
    if !self.in_history_list() || len == 0 {
      return;
    }
    self.history_cursor = match self.history_cursor {
      None => Some(len - 1),
      Some(0) => None,
      Some(i) => Some(i.min(len) - 1),
    };
  }

  /// Load `history[index]` into the query without searching.
  pub fn select_history_entry(&mut self, index: usize, history: &SearchHistory) -> bool {
    if !self.in_history_list() {
      return false;
    }
    let Some(entry) = history.get(index) else { return false };
    self.history_cursor = Some(index);
    self.set_query(entry.to_string());
    true
  }

  pub fn set_query(&mut self, query: String) {
    self.cursor = query.chars().count();
    self.query = query;
  }

  // --- Query editing ---

  pub fn insert_char(&mut self, c: char) {
    let byte_idx = char_to_byte_index(&self.query, self.cursor);
    self.query.insert(byte_idx, c);
    self.cursor += 1;
  }

  pub fn backspace(&mut self) {
    if self.cursor > 0 {
      self.cursor -= 1;
      let byte_idx = char_to_byte_index(&self.query, self.cursor);
      self.query.remove(byte_idx);
    }
  }

  pub fn delete(&mut self) {
    if self.cursor < self.query.chars().count() {
      let byte_idx = char_to_byte_index(&self.query, self.cursor);
      self.query.remove(byte_idx);
    }
  }

  pub fn cursor_left(&mut self) {
    self.cursor = self.cursor.saturating_sub(1);
  }

  pub fn cursor_right(&mut self) {
    if self.cursor < self.query.chars().count() {
      self.cursor += 1;
    }
  }

  pub fn cursor_home(&mut self) {
    self.cursor = 0;
  }

  pub fn cursor_end(&mut self) {
    self.cursor = self.query.chars().count();
  }

  fn in_history_list(&self) -> bool {
    self.focus == View::Search && self.edit_mode == EditMode::Normal
  }

  fn reset_edit_state(&mut self) {
    self.edit_mode = EditMode::Normal;
    self.history_cursor = None;
    self.cursor = self.query.chars().count();
  }
}

fn clamp_index(index: usize, len: usize) -> usize {
  if len == 0 { 0 } else { index.min(len - 1) }
}

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Bounded, deduplicated, most-recent-first list of submitted queries.
#[derive(Debug, Clone)]
pub struct SearchHistory {
  entries: Vec<String>,
  cap: usize,
}

impl SearchHistory {
  pub fn new(cap: usize) -> Self {
    Self { entries: Vec::new(), cap }
  }

  /// Build from persisted entries (most recent first), dropping blanks,
  /// duplicates and anything past the cap.
  pub fn from_entries(entries: impl IntoIterator<Item = String>, cap: usize) -> Self {
    let mut kept: Vec<String> = Vec::new();
    for entry in entries {
      if !entry.is_empty() && !kept.contains(&entry) {
        kept.push(entry);
      }
    }
    kept.truncate(cap);
    Self { entries: kept, cap }
  }

  /// Move `query` to the front, inserting it if new.
  pub fn record(&mut self, query: &str) {
    if query.is_empty() {
      return;
    }
    self.entries.retain(|e| e != query);
    self.entries.insert(0, query.to_string());
    self.entries.truncate(self.cap);
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.entries.get(index).map(String::as_str)
  }

  pub fn entries(&self) -> &[String] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(view: View, selection: usize, len: usize) -> NavigationContext {
    let mut nav = NavigationContext::new();
    nav.focus_switch(view);
    nav.select(selection, len);
    nav
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }

  // --- selection ---

  #[test]
  fn move_selection_clamps_without_wrap() {
    let mut nav = at(View::Results, 0, 3);
    assert!(!nav.move_selection(-1, 3));
    assert_eq!(nav.selection(), 0);
    assert!(nav.move_selection(1, 3));
    assert!(nav.move_selection(1, 3));
    assert!(!nav.move_selection(1, 3));
    assert_eq!(nav.selection(), 2);
    nav.move_selection(10, 3);
    assert_eq!(nav.selection(), 2);
  }

  #[test]
  fn move_selection_on_empty_list_is_noop() {
    let mut nav = at(View::Results, 0, 0);
    assert!(!nav.move_selection(-1, 0));
    assert_eq!(nav.selection(), 0);
    assert!(!nav.move_selection(1, 0));
    assert_eq!(nav.selection(), 0);
  }

  #[test]
  fn move_selection_recovers_from_shrunk_list() {
    let mut nav = at(View::Downloads, 7, 8);
    // list shrank to 3 items behind our back
    nav.move_selection(-1, 3);
    assert_eq!(nav.selection(), 1);
  }

  #[test]
  fn selection_stays_in_bounds_over_mixed_transitions() {
    let lens = [0usize, 1, 4, 9];
    let mut nav = NavigationContext::new();
    for step in 0..200usize {
      let len = lens[step % lens.len()];
      match step % 5 {
        0 => nav.focus_switch(View::ALL[step % View::ALL.len()]),
        1 | 2 => {
          nav.move_selection(1, len);
        }
        3 => {
          nav.move_selection(-1, len);
        }
        _ => nav.clamp_selection(len),
      }
      nav.clamp_selection(len);
      assert!(nav.selection() < len.max(1), "step {step}: selection {} len {len}", nav.selection());
    }
  }

  #[test]
  fn focus_switch_resets_selection_scroll_and_insert() {
    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Results);
    nav.select(30, 50);
    nav.fit_to_list(50, 10);
    assert!(nav.scroll(View::Results) > 0);

    nav.focus_switch(View::Search);
    nav.toggle_edit_mode();
    assert!(nav.is_inserting());

    nav.focus_switch(View::Results);
    assert_eq!(nav.selection(), 0);
    assert_eq!(nav.scroll(View::Results), 0);
    assert_eq!(nav.edit_mode(), EditMode::Normal);
  }

  #[test]
  fn scroll_offsets_are_kept_per_view() {
    let mut nav = at(View::Downloads, 20, 40);
    nav.fit_to_list(40, 10);
    let downloads_scroll = nav.scroll(View::Downloads);
    nav.focus_switch(View::Home);
    assert_eq!(nav.scroll(View::Downloads), downloads_scroll);
  }

  #[test]
  fn fit_to_list_keeps_selection_visible() {
    let mut nav = at(View::Results, 0, 30);
    assert_eq!(nav.fit_to_list(30, 10), 0);
    nav.select(15, 30);
    assert_eq!(nav.fit_to_list(30, 10), 6);
    nav.select(3, 30);
    assert_eq!(nav.fit_to_list(30, 10), 3);
  }

  #[test]
  fn fit_to_list_respects_max_offset_when_rows_grow() {
    let mut nav = at(View::Results, 29, 30);
    assert_eq!(nav.fit_to_list(30, 10), 20);
    // terminal got taller
    assert_eq!(nav.fit_to_list(30, 25), 5);
    // list shrank below the viewport
    assert_eq!(nav.fit_to_list(12, 25), 0);
    assert_eq!(nav.selection(), 11);
  }

  #[test]
  fn fit_to_list_with_zero_rows() {
    let mut nav = at(View::Results, 4, 30);
    assert_eq!(nav.fit_to_list(30, 0), 0);
  }

  // --- channel return frame ---

  #[test]
  fn enter_leave_channel_round_trip() {
    for origin in [View::Home, View::Results, View::Downloads, View::Subscriptions] {
      let mut nav = at(origin, 3, 5);
      nav.enter_channel();
      assert_eq!(nav.focus(), View::Channel);
      assert_eq!(nav.selection(), 0);
      nav.move_selection(4, 10);

      let frame = nav.leave_channel(|_| 5).unwrap();
      assert_eq!(frame, ReturnFrame { view: origin, selection: 3 });
      assert_eq!(nav.focus(), origin);
      assert_eq!(nav.selection(), 3);
      assert_eq!(nav.return_frame(), None);
    }
  }

  #[test]
  fn nested_channel_entry_keeps_first_frame() {
    let mut nav = at(View::Results, 2, 5);
    nav.enter_channel();
    let first = nav.return_frame();
    nav.move_selection(3, 10);
    nav.enter_channel();
    assert_eq!(nav.return_frame(), first);
    nav.leave_channel(|_| 5);
    assert_eq!((nav.focus(), nav.selection()), (View::Results, 2));
  }

  #[test]
  fn leave_channel_without_frame_defaults_to_subscriptions() {
    let mut nav = at(View::Results, 2, 5);
    nav.enter_channel();
    nav.focus_switch(View::Channel);
    // focus switch to Channel keeps the frame
    assert!(nav.return_frame().is_some());

    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Channel);
    let frame = nav.leave_channel(|_| 3).unwrap();
    assert_eq!(frame, ReturnFrame::DEFAULT);
    assert_eq!((nav.focus(), nav.selection()), (View::Subscriptions, 0));
  }

  #[test]
  fn leave_channel_clamps_to_current_list() {
    let mut nav = at(View::Downloads, 6, 7);
    nav.enter_channel();
    nav.leave_channel(|v| if v == View::Downloads { 2 } else { 0 });
    assert_eq!(nav.selection(), 1);
  }

  #[test]
  fn leave_channel_outside_channel_is_noop() {
    let mut nav = at(View::Results, 1, 3);
    assert_eq!(nav.leave_channel(|_| 3), None);
    assert_eq!((nav.focus(), nav.selection()), (View::Results, 1));
  }

  #[test]
  fn focus_switch_away_clears_frame() {
    let mut nav = at(View::Results, 1, 3);
    nav.enter_channel();
    nav.focus_switch(View::Downloads);
    assert_eq!(nav.return_frame(), None);
  }

  #[test]
  fn generation_bumps_on_focus_changes_only() {
    let mut nav = NavigationContext::new();
    let g0 = nav.generation();
    nav.move_selection(1, 5);
    nav.insert_char('x');
    assert_eq!(nav.generation(), g0);
    nav.focus_switch(View::Results);
    let g1 = nav.generation();
    assert!(g1 > g0);
    nav.enter_channel();
    assert!(nav.generation() > g1);
  }

  // --- search sub-states ---

  #[test]
  fn toggle_edit_mode_only_in_search() {
    let mut nav = NavigationContext::new();
    assert!(!nav.toggle_edit_mode());
    nav.focus_switch(View::Search);
    assert!(nav.toggle_edit_mode());
    assert_eq!(nav.edit_mode(), EditMode::Insert);
    assert!(nav.toggle_edit_mode());
    assert_eq!(nav.edit_mode(), EditMode::Normal);
  }

  #[test]
  fn toggle_edit_mode_resets_history_cursor() {
    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Search);
    nav.history_next(3);
    assert_eq!(nav.history_cursor(), Some(0));
    nav.toggle_edit_mode();
    assert_eq!(nav.history_cursor(), None);
  }

  #[test]
  fn history_cursor_walk() {
    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Search);
    nav.history_next(2);
    nav.history_next(2);
    nav.history_next(2);
    assert_eq!(nav.history_cursor(), Some(1));
    nav.history_prev(2);
    assert_eq!(nav.history_cursor(), Some(0));
    nav.history_prev(2);
    assert_eq!(nav.history_cursor(), None);
    nav.history_prev(2);
    assert_eq!(nav.history_cursor(), Some(1));
  }

  #[test]
  fn history_cursor_ignored_when_empty_or_inserting() {
    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Search);
    nav.history_next(0);
    assert_eq!(nav.history_cursor(), None);
    nav.toggle_edit_mode();
    nav.history_next(3);
    assert_eq!(nav.history_cursor(), None);
  }

  #[test]
  fn select_history_entry_loads_query() {
    let mut history = SearchHistory::new(50);
    history.record("cats");
    history.record("dogs");
    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Search);
    assert!(nav.select_history_entry(1, &history));
    assert_eq!(nav.query(), "cats");
    assert_eq!(nav.cursor(), 4);
    assert!(!nav.select_history_entry(5, &history));

    nav.toggle_edit_mode();
    assert!(!nav.select_history_entry(0, &history));
    assert_eq!(nav.query(), "cats");
  }

  #[test]
  fn query_editing_is_multibyte_safe() {
    let mut nav = NavigationContext::new();
    nav.focus_switch(View::Search);
    for c in "aé日".chars() {
      nav.insert_char(c);
    }
    nav.cursor_left();
    nav.backspace();
    assert_eq!(nav.query(), "a日");
    nav.cursor_home();
    nav.delete();
    assert_eq!(nav.query(), "日");
    nav.cursor_end();
    nav.cursor_right();
    assert_eq!(nav.cursor(), 1);
    nav.insert_char('!');
    assert_eq!(nav.query(), "日!");
  }

  // --- SearchHistory ---

  #[test]
  fn record_moves_existing_to_front() {
    let mut history = SearchHistory::new(50);
    history.record("cats");
    history.record("dogs");
    history.record("cats");
    assert_eq!(history.entries(), ["cats", "dogs"]);
  }

  #[test]
  fn record_respects_cap() {
    let mut history = SearchHistory::new(50);
    for i in 0..60 {
      history.record(&format!("q{i}"));
    }
    assert_eq!(history.len(), 50);
    assert_eq!(history.get(0), Some("q59"));
    history.record("q30");
    assert_eq!(history.len(), 50);
    assert_eq!(history.get(0), Some("q30"));
  }

  #[test]
  fn record_ignores_empty_query() {
    let mut history = SearchHistory::new(50);
    history.record("");
    assert!(history.is_empty());
  }

  #[test]
  fn from_entries_dedupes_and_truncates() {
    let raw = vec!["a".to_string(), "b".to_string(), "a".to_string(), String::new(), "c".to_string()];
    let history = SearchHistory::from_entries(raw, 2);
    assert_eq!(history.entries(), ["a", "b"]);
  }
}
