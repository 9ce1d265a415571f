use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::nav::View;

/// Rows skipped by PageUp / PageDown.
const PAGE: isize = 10;

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if app.nav.is_inserting() {
    handle_insert_key(app, key);
  } else {
    handle_normal_key(app, key);
  }
}

/// Editing the search query.
fn handle_insert_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Enter => app.select(),
    KeyCode::Esc => app.nav.exit_insert(),
    KeyCode::Tab => {
      app.nav.toggle_edit_mode();
    }
    KeyCode::Char(c) => app.nav.insert_char(c),
    KeyCode::Backspace => app.nav.backspace(),
    KeyCode::Delete => app.nav.delete(),
    KeyCode::Left => app.nav.cursor_left(),
    KeyCode::Right => app.nav.cursor_right(),
    KeyCode::Home => app.nav.cursor_home(),
    KeyCode::End => app.nav.cursor_end(),
    _ => {}
  }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Char('Q') => app.should_quit = true,

    KeyCode::Char('a') => app.focus(View::Home),
    KeyCode::Char('s') => app.focus(View::Search),
    KeyCode::Char('d') => app.focus(View::Downloads),
    KeyCode::Char('w') => app.focus(View::Subscriptions),

    KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Down => app.move_selection(1),
    KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Up => app.move_selection(-1),
    KeyCode::PageDown => app.move_selection(PAGE),
    KeyCode::PageUp => app.move_selection(-PAGE),
    KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Left | KeyCode::Esc => app.go_back(),
    KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Right | KeyCode::Enter => app.select(),

    KeyCode::Char('D') => app.download_selected(),
    KeyCode::Char('c') => app.open_channel(),
    KeyCode::Char('r') => app.refresh(),
    KeyCode::Char('S') => app.toggle_subscription(),

    KeyCode::Tab => {
      app.nav.toggle_edit_mode();
    }
    KeyCode::Char('i') | KeyCode::Char('/') if app.nav.focus() == View::Search => app.nav.enter_insert(),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::VideoDir;
  use crate::nav::EditMode;
  use crate::testing::{FakeDownloader, FakePlayer, FakeProvider};
  use std::sync::Arc;

  fn app() -> App {
    App::new(
      Arc::new(FakeProvider::default()),
      Box::new(FakeDownloader::default()),
      Box::new(FakePlayer::default()),
      VideoDir::new("/nonexistent/ytui-videos"),
      20,
    )
  }

  fn press(app: &mut App, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      press(app, KeyCode::Char(c));
    }
  }

  #[test]
  fn ctrl_c_quits_even_while_typing() {
    let mut app = app();
    press(&mut app, KeyCode::Char('s'));
    press(&mut app, KeyCode::Tab);
    handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[test]
  fn view_keys_switch_focus() {
    let mut app = app();
    for (key, view) in [('s', View::Search), ('d', View::Downloads), ('w', View::Subscriptions), ('a', View::Home)] {
      press(&mut app, KeyCode::Char(key));
      assert_eq!(app.nav.focus(), view);
    }
  }

  #[test]
  fn letters_are_text_in_insert_mode() {
    let mut app = app();
    press(&mut app, KeyCode::Char('s'));
    press(&mut app, KeyCode::Tab);
    type_str(&mut app, "Quad jazz");
    assert_eq!(app.nav.query(), "Quad jazz");
    assert_eq!(app.nav.focus(), View::Search);
    assert!(!app.should_quit);

    press(&mut app, KeyCode::Home);
    press(&mut app, KeyCode::Delete);
    press(&mut app, KeyCode::End);
    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.nav.query(), "uad jaz");

    press(&mut app, KeyCode::Esc);
    assert_eq!(app.nav.edit_mode(), EditMode::Normal);
  }

  #[test]
  fn shift_q_quits_outside_insert() {
    let mut app = app();
    press(&mut app, KeyCode::Char('Q'));
    assert!(app.should_quit);
  }

  #[test]
  fn navigation_keys_on_empty_list_do_nothing() {
    let mut app = app();
    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Up);
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char('D'));
    assert_eq!(app.nav.selection(), 0);
    assert!(app.status.is_none());
  }

  #[test]
  fn slash_enters_insert_only_in_search() {
    let mut app = app();
    press(&mut app, KeyCode::Char('/'));
    assert!(!app.nav.is_inserting());
    press(&mut app, KeyCode::Char('s'));
    press(&mut app, KeyCode::Char('/'));
    assert!(app.nav.is_inserting());
  }
}
