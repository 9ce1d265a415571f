use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, ListState, Padding, Paragraph},
};

use crate::App;
use crate::media::MediaItem;
use crate::nav::View;
use crate::views::{ListSource, SelectAction};

// --- Palette ---

struct Palette {
  fg: Color,
  muted: Color,
  accent: Color,
  border: Color,
  highlight_fg: Color,
  highlight_bg: Color,
  stripe_bg: Color,
  status: Color,
  error: Color,
  key_fg: Color,
  key_bg: Color,
}

const PALETTE: Palette = Palette {
  fg: Color::Rgb(220, 220, 220),
  muted: Color::Rgb(130, 130, 140),
  accent: Color::Rgb(255, 85, 85),
  border: Color::Rgb(90, 90, 100),
  highlight_fg: Color::Rgb(20, 20, 20),
  highlight_bg: Color::Rgb(255, 140, 120),
  stripe_bg: Color::Rgb(32, 32, 38),
  status: Color::Rgb(140, 200, 255),
  error: Color::Rgb(255, 110, 90),
  key_fg: Color::Rgb(20, 20, 20),
  key_bg: Color::Rgb(170, 170, 180),
};

/// Views reachable from the tab bar, with their keys.
const TABS: [(View, char); 4] =
  [(View::Home, 'a'), (View::Search, 's'), (View::Downloads, 'd'), (View::Subscriptions, 'w')];

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` columns, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if display_width(s, usize::MAX) <= max_width {
    return s.to_string();
  }
  if max_width == 0 {
    return String::new();
  }
  let mut out = String::new();
  let mut width = 0;
  for c in s.chars() {
    let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
    if width + w + 1 > max_width {
      break;
    }
    width += w;
    out.push(c);
  }
  out.push('…');
  out
}

fn bordered(title: impl Into<Line<'static>>, active: bool) -> Block<'static> {
  let color = if active { PALETTE.accent } else { PALETTE.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(PALETTE.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let [header_area, main_area, status_area, footer_area] =
    Layout::vertical([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
      .areas(frame.area());

  render_header(frame, app, header_area);
  let focus = app.nav.focus();
  if focus.has_media() {
    render_media(frame, app, main_area);
  } else if focus == View::Search {
    render_search(frame, app, main_area);
  } else {
    render_subscriptions(frame, app, main_area);
  }
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let focus = app.nav.focus();
  let mut spans = vec![Span::styled(" ▶ ytui ", Style::default().fg(PALETTE.accent).add_modifier(Modifier::BOLD))];
  for (view, key) in TABS {
    let style = if view == focus {
      Style::default().fg(PALETTE.highlight_fg).bg(PALETTE.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(PALETTE.muted)
    };
    spans.push(Span::raw(" "));
    spans.push(Span::styled(format!(" {} {} ", key, view.label()), style));
  }
  if focus == View::Channel {
    spans.push(Span::raw(" "));
    spans.push(Span::styled(" Channel ", Style::default().fg(PALETTE.highlight_fg).bg(PALETTE.highlight_bg)));
  }
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(PALETTE.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn media_title(app: &App, focus: View) -> String {
  let count = app.list_len(focus);
  match focus {
    View::Home => format!(" History ({}) ", count),
    View::Results => format!(" Results for '{}' ({}) ", app.nav.query(), count),
    View::Downloads => format!(" Downloads ({}) ", count),
    View::Channel => match &app.channel {
      Some(view) => {
        let star = if app.is_subscribed(&view.channel) { "★ " } else { "" };
        let loading = if view.loading { " (loading…)" } else { "" };
        format!(" {}{}{} ", star, view.channel.label(), loading)
      }
      None => " Channel ".to_string(),
    },
    _ => format!(" {} ", focus.label()),
  }
}

fn empty_hint(app: &App, focus: View) -> &'static str {
  match focus {
    View::Home => "Nothing played yet. Press s to search.",
    View::Results => "No results.",
    View::Downloads => "No downloads. Press D on a video to fetch it.",
    View::Channel if app.channel.as_ref().is_some_and(|c| c.loading) => "Loading channel…",
    _ => "No videos found for channel.",
  }
}

fn render_media(frame: &mut Frame, app: &mut App, area: Rect) {
  let focus = app.nav.focus();
  let block = bordered(media_title(app, focus), true);
  let len = app.list_len(focus);
  let rows = area.height.saturating_sub(2) as usize;
  let offset = app.nav.fit_to_list(len, rows);

  if len == 0 {
    let hint = Paragraph::new(Line::from(Span::styled(empty_hint(app, focus), Style::default().fg(PALETTE.muted))))
      .alignment(Alignment::Center)
      .block(block.padding(Padding::top(1)));
    frame.render_widget(hint, area);
    return;
  }

  // Borders, highlight symbol and the status marker.
  let inner_w = area.width.saturating_sub(6) as usize;
  let selected = app.nav.selection();
  let items: Vec<ListItem> =
    app.media_list(focus).iter().enumerate().map(|(i, item)| media_row(app, item, i, i == selected, inner_w)).collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(PALETTE.highlight_fg).bg(PALETTE.highlight_bg).add_modifier(Modifier::BOLD));

  let mut state = ListState::default().with_offset(offset).with_selected(Some(selected));
  frame.render_stateful_widget(list, area, &mut state);
}

fn media_row(app: &App, item: &MediaItem, index: usize, is_selected: bool, inner_w: usize) -> ListItem<'static> {
  let fg = if is_selected { PALETTE.highlight_fg } else { PALETTE.fg };
  let bg = if is_selected {
    PALETTE.highlight_bg
  } else if index % 2 == 1 {
    PALETTE.stripe_bg
  } else {
    Color::Reset
  };

  let marker = if app.is_downloaded(&item.id) {
    "✓ "
  } else if app.is_downloading(&item.id) {
    "↓ "
  } else {
    "  "
  };

  let channel = item.channel_name.as_deref().unwrap_or("");
  let channel_w = display_width(channel, usize::MAX).min(inner_w / 3);
  let title_max = if channel_w > 0 { inner_w.saturating_sub(channel_w + 2) } else { inner_w };
  let title = truncate_str(item.label(), title_max);
  let gap = inner_w.saturating_sub(display_width(&title, usize::MAX) + channel_w);

  let line = Line::from(vec![
    Span::styled(marker, Style::default().fg(PALETTE.status)),
    Span::styled(title, Style::default().fg(fg)),
    Span::raw(" ".repeat(gap)),
    Span::styled(truncate_str(channel, channel_w), Style::default().fg(PALETTE.muted)),
  ]);
  ListItem::new(line).bg(bg)
}

fn render_subscriptions(frame: &mut Frame, app: &mut App, area: Rect) {
  let len = app.subscriptions.len();
  let block = bordered(format!(" Subscriptions ({}) ", len), true);
  let rows = area.height.saturating_sub(2) as usize;
  let offset = app.nav.fit_to_list(len, rows);

  if len == 0 {
    let hint = Paragraph::new(Line::from(Span::styled(
      "No subscriptions. Open a channel with c and press S to subscribe.",
      Style::default().fg(PALETTE.muted),
    )))
    .alignment(Alignment::Center)
    .block(block.padding(Padding::top(1)));
    frame.render_widget(hint, area);
    return;
  }

  let inner_w = area.width.saturating_sub(4) as usize;
  let items: Vec<ListItem> = app
    .subscriptions
    .iter()
    .map(|sub| {
      let name = truncate_str(sub.label(), inner_w / 2);
      let url_w = inner_w.saturating_sub(display_width(&name, usize::MAX) + 2);
      ListItem::new(Line::from(vec![
        Span::styled(name, Style::default().fg(PALETTE.fg)),
        Span::raw("  "),
        Span::styled(truncate_str(&sub.url, url_w), Style::default().fg(PALETTE.muted)),
      ]))
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(PALETTE.highlight_fg).bg(PALETTE.highlight_bg).add_modifier(Modifier::BOLD));
  let mut state = ListState::default().with_offset(offset).with_selected(Some(app.nav.selection()));
  frame.render_stateful_widget(list, area, &mut state);
}

fn render_search(frame: &mut Frame, app: &App, area: Rect) {
  let [input_area, history_area] = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
  let inserting = app.nav.is_inserting();

  let title = if inserting { " Search (editing) " } else { " Search " };
  let input_block = bordered(title, inserting).padding(Padding::horizontal(1));

  let query = app.nav.query();
  let inner_w = input_area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(query, app.nav.cursor());
  let scroll = (cursor_col + 1).saturating_sub(inner_w);

  let visible: String = query
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let highlight_input = !inserting && app.nav.history_cursor().is_none();
  let input_style = if highlight_input {
    Style::default().fg(PALETTE.fg).add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(PALETTE.fg)
  };
  frame.render_widget(Paragraph::new(visible).style(input_style).block(input_block), input_area);

  if inserting {
    let cursor_x = input_area.x + 2 + cursor_col.saturating_sub(scroll) as u16;
    frame.set_cursor_position((cursor_x, input_area.y + 1));
  }

  let recent = app.recent_searches();
  let items: Vec<ListItem> =
    recent.iter().map(|q| ListItem::new(Line::from(Span::styled(q.clone(), Style::default().fg(PALETTE.fg))))).collect();
  let list = List::new(items)
    .block(bordered(" Recent searches ", false))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(PALETTE.highlight_fg).bg(PALETTE.highlight_bg).add_modifier(Modifier::BOLD));
  let mut state = ListState::default().with_selected(if inserting { None } else { app.nav.history_cursor() });
  frame.render_stateful_widget(list, history_area, &mut state);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let (text, style) = if let Some(status) = &app.status {
    if status.is_error {
      (format!(" ⚠  {}", status.text), Style::default().fg(PALETTE.error))
    } else {
      (format!(" {}", status.text), Style::default().fg(PALETTE.status))
    }
  } else if app.is_busy() {
    (" ⏳ Working…".to_string(), Style::default().fg(PALETTE.status))
  } else {
    (" Ready".to_string(), Style::default().fg(PALETTE.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);

  if app.nav.focus() == View::Downloads {
    let (files, active) = app.download_counts();
    let counts = format!("{} files | {} active ", files, active);
    let right_area =
      Rect { x: area.x + area.width.saturating_sub(counts.len() as u16), width: counts.len() as u16, ..area };
    frame.render_widget(Line::from(Span::styled(counts, Style::default().fg(PALETTE.muted))), right_area);
  }
}

fn footer_keys(app: &App) -> Vec<(&'static str, &'static str)> {
  let focus = app.nav.focus();
  if app.nav.is_inserting() {
    return vec![("Enter", "Search"), ("Esc", "Done"), ("Tab", "History")];
  }
  if focus == View::Search {
    return vec![("Tab", "Edit"), ("j/k", "History"), ("Enter", "Select"), ("Q", "Quit")];
  }

  let caps = focus.capabilities();
  let mut keys = Vec::new();
  if caps.list != ListSource::None {
    keys.push(("j/k", "Navigate"));
  }
  match caps.on_select {
    Some(SelectAction::Play) => keys.push(("Enter", "Play")),
    Some(SelectAction::EnterSubscription) => keys.push(("Enter", "Open")),
    None => {}
  }
  if caps.on_back.is_some() {
    keys.push(("h", "Back"));
  }
  if caps.on_download {
    keys.push(("D", "Download"));
  }
  if caps.on_channel {
    keys.push(("c", "Channel"));
  }
  if caps.on_refresh.is_some() {
    keys.push(("r", "Refresh"));
  }
  if focus == View::Channel {
    let subscribed = app.channel.as_ref().is_some_and(|c| app.is_subscribed(&c.channel));
    keys.push(("S", if subscribed { "Unsubscribe" } else { "Subscribe" }));
  }
  keys.push(("Q", "Quit"));
  keys
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let keys = footer_keys(app);
  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(PALETTE.key_fg).bg(PALETTE.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(PALETTE.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);
}
