//! In-memory collaborators for unit tests.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::error::{ProviderError, SpawnError};
use crate::jobs::{Downloader, ProcessHandle, ProcessState};
use crate::media::MediaItem;
use crate::player::Player;
use crate::youtube::SearchProvider;

// --- Downloader ---

#[derive(Default)]
struct DownloaderState {
  spawned: Vec<String>,
  exited: HashMap<String, Arc<AtomicBool>>,
  fail: bool,
}

#[derive(Clone, Default)]
pub struct FakeDownloader {
  state: Arc<Mutex<DownloaderState>>,
}

impl FakeDownloader {
  pub fn failing() -> Self {
    let fake = Self::default();
    fake.state.lock().unwrap().fail = true;
    fake
  }

  pub fn spawned(&self) -> Vec<String> {
    self.state.lock().unwrap().spawned.clone()
  }

  /// Mark every process started for `id` as exited.
  pub fn finish(&self, id: &str) {
    if let Some(flag) = self.state.lock().unwrap().exited.get(id) {
      flag.store(true, Ordering::SeqCst);
    }
  }
}

struct FakeProcess {
  exited: Arc<AtomicBool>,
}

impl ProcessHandle for FakeProcess {
  fn poll(&mut self) -> ProcessState {
    if self.exited.load(Ordering::SeqCst) { ProcessState::Exited } else { ProcessState::Running }
  }
}

impl Downloader for FakeDownloader {
  fn spawn(&self, item: &MediaItem) -> Result<Box<dyn ProcessHandle>, SpawnError> {
    let mut state = self.state.lock().unwrap();
    if state.fail {
      return Err(SpawnError::NotInstalled("yt-dlp"));
    }
    state.spawned.push(item.id.clone());
    let exited = Arc::clone(state.exited.entry(item.id.clone()).or_default());
    Ok(Box::new(FakeProcess { exited }))
  }
}

// --- SearchProvider ---

#[derive(Default)]
struct ProviderState {
  responses: HashMap<String, Result<Vec<MediaItem>, String>>,
  calls: Vec<(String, usize)>,
  gate: Option<Arc<Semaphore>>,
}

#[derive(Clone, Default)]
pub struct FakeProvider {
  state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
  pub fn respond(&self, source: &str, items: Vec<MediaItem>) {
    self.state.lock().unwrap().responses.insert(source.to_string(), Ok(items));
  }

  pub fn fail(&self, source: &str, msg: &str) {
    self.state.lock().unwrap().responses.insert(source.to_string(), Err(msg.to_string()));
  }

  pub fn calls(&self) -> Vec<(String, usize)> {
    self.state.lock().unwrap().calls.clone()
  }

  /// Make fetches issued from now on wait until `release`.
  pub fn hold(&self) {
    self.state.lock().unwrap().gate = Some(Arc::new(Semaphore::new(0)));
  }

  pub fn release(&self) {
    if let Some(gate) = self.state.lock().unwrap().gate.take() {
      gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
  }
}

impl SearchProvider for FakeProvider {
  fn fetch(&self, source: &str, limit: usize) -> BoxFuture<'static, Result<Vec<MediaItem>, ProviderError>> {
    let mut state = self.state.lock().unwrap();
    state.calls.push((source.to_string(), limit));
    let result = match state.responses.get(source) {
      Some(Ok(items)) => Ok(items.clone()),
      Some(Err(msg)) => Err(ProviderError::Failed(msg.clone())),
      None => Ok(Vec::new()),
    };
    let gate = state.gate.clone();
    async move {
      if let Some(gate) = gate {
        let _permit = gate.acquire().await;
      }
      result
    }
    .boxed()
  }
}

// --- Player ---

#[derive(Default)]
struct PlayerState {
  played: Vec<String>,
  fail: bool,
}

#[derive(Clone, Default)]
pub struct FakePlayer {
  state: Arc<Mutex<PlayerState>>,
}

impl FakePlayer {
  pub fn failing() -> Self {
    let fake = Self::default();
    fake.state.lock().unwrap().fail = true;
    fake
  }

  pub fn played(&self) -> Vec<String> {
    self.state.lock().unwrap().played.clone()
  }
}

impl Player for FakePlayer {
  fn play(&self, target: &str) -> Result<(), SpawnError> {
    let mut state = self.state.lock().unwrap();
    if state.fail {
      return Err(SpawnError::NotInstalled("mpv"));
    }
    state.played.push(target.to_string());
    Ok(())
  }
}
