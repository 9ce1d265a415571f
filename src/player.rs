use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use crate::error::SpawnError;

/// Starts playback of a local path or URL. Playback is not tracked.
pub trait Player: Send {
  fn play(&self, target: &str) -> Result<(), SpawnError>;
}

/// Launches `mpv` detached from the terminal.
#[derive(Debug, Clone)]
pub struct Mpv {
  args: Vec<String>,
}

impl Mpv {
  pub fn new(args: Vec<String>) -> Self {
    Self { args }
  }
}

impl Player for Mpv {
  fn play(&self, target: &str) -> Result<(), SpawnError> {
    let mut cmd = Command::new("mpv");
    cmd.args(&self.args).arg("--").arg(target);
    cmd.stdin(Stdio::null());
    // mpv would otherwise draw over the TUI.
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());

    let child = cmd.spawn().map_err(|e| SpawnError::from_io("mpv", e))?;
    info!(url = %target, pid = ?child.id(), "player: mpv started");
    // Dropping the handle leaves mpv running; tokio reaps it on exit.
    drop(child);
    Ok(())
  }
}
