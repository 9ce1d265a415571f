mod app;
mod cache;
mod config;
mod constants;
mod error;
mod input;
mod jobs;
mod logging;
mod media;
mod nav;
mod player;
mod store;
mod ui;
mod views;
mod youtube;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use app::App;
use cache::VideoDir;
use config::{Config, Paths};
use constants::constants;
use input::handle_key_event;
use player::Mpv;
use store::Store;
use youtube::YtDlp;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Directory for cached videos, history and logs
  #[arg(long, value_name = "DIR")]
  cache_dir: Option<PathBuf>,

  /// Directory holding prefs.toml and the subscriptions file
  #[arg(long, value_name = "DIR")]
  config_dir: Option<PathBuf>,

  /// Log level ('debug', 'info', ...) or a full filter directive; RUST_LOG wins
  #[arg(long, value_name = "LEVEL")]
  log_level: Option<String>,

  /// Print a shell completion script and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "ytui", &mut std::io::stdout());
    return Ok(());
  }

  let paths = Paths::resolve(args.config_dir.clone(), args.cache_dir.clone())?;
  let _log_guard = logging::init(&paths.log_dir(), args.log_level.as_deref())?;
  let app = build_app(&paths)?;

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, app);
  ratatui::restore();
  info!("exiting");
  result
}

fn build_app(paths: &Paths) -> Result<App> {
  let config = Config::load(paths);
  let video_dir = VideoDir::new(config.video_dir(paths));
  video_dir.ensure()?;

  let ytdlp = YtDlp::new(video_dir.root().to_path_buf(), config.download_format());
  let mut app = App::new(
    Arc::new(ytdlp.clone()),
    Box::new(ytdlp),
    Box::new(Mpv::new(config.player_args())),
    video_dir,
    config.search_limit(),
  );
  app.load(Store::new(paths));
  info!(config = %paths.config_dir.display(), cache = %paths.cache_dir.display(), "ytui started");
  Ok(app)
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  loop {
    app.tick();

    terminal.draw(|frame| ui::ui(frame, &mut app)).context("Failed to draw frame")?;

    if event::poll(constants().tick())? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_event(&mut app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  Ok(())
}
