//! Background download supervision.
//!
//! Jobs are external processes; the supervisor only observes them through a
//! non-blocking poll. Exit codes are not inspected: whether a download
//! actually produced a file is decided by the disk scan.

use std::fmt;
use tracing::{info, warn};

use crate::error::SpawnError;
use crate::media::MediaItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
  Running,
  Exited,
}

/// A spawned process that can be checked for exit without blocking.
pub trait ProcessHandle: Send {
  fn poll(&mut self) -> ProcessState;

  fn pid(&self) -> Option<u32> {
    None
  }
}

impl ProcessHandle for tokio::process::Child {
  fn poll(&mut self) -> ProcessState {
    match self.try_wait() {
      Ok(None) => ProcessState::Running,
      Ok(Some(_)) => ProcessState::Exited,
      Err(e) => {
        // Nothing more can be observed about this process.
        warn!(err = %e, "jobs: try_wait failed, treating process as exited");
        ProcessState::Exited
      }
    }
  }

  fn pid(&self) -> Option<u32> {
    self.id()
  }
}

/// Starts a download of one item and hands back its process.
pub trait Downloader: Send {
  fn spawn(&self, item: &MediaItem) -> Result<Box<dyn ProcessHandle>, SpawnError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

pub struct DownloadJob {
  pub handle: JobHandle,
  pub item: MediaItem,
  pub completed: bool,
  process: Box<dyn ProcessHandle>,
}

impl fmt::Debug for DownloadJob {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DownloadJob")
      .field("handle", &self.handle)
      .field("item", &self.item.id)
      .field("completed", &self.completed)
      .field("pid", &self.process.pid())
      .finish()
  }
}

pub struct JobSupervisor {
  downloader: Box<dyn Downloader>,
  jobs: Vec<DownloadJob>,
  next_handle: u64,
}

impl JobSupervisor {
  pub fn new(downloader: Box<dyn Downloader>) -> Self {
    Self { downloader, jobs: Vec::new(), next_handle: 0 }
  }

  /// Start downloading `item`. Never waits for the process to finish.
  ///
  /// Repeated enqueues of the same id are not deduplicated here; the
  /// downloads view dedupes by id when it is reconciled.
  pub fn enqueue(&mut self, item: MediaItem) -> Result<JobHandle, SpawnError> {
    let process = self.downloader.spawn(&item)?;
    let handle = JobHandle(self.next_handle);
    self.next_handle += 1;
    info!(id = %item.id, pid = ?process.pid(), "jobs: download started");
    self.jobs.push(DownloadJob { handle, item, completed: false, process });
    Ok(handle)
  }

  /// Poll every job once and remove those whose process has exited.
  /// Returns the removed jobs, marked completed.
  pub fn poll_and_reap(&mut self) -> Vec<DownloadJob> {
    if self.jobs.is_empty() {
      return Vec::new();
    }
    for job in &mut self.jobs {
      if job.process.poll() == ProcessState::Exited {
        job.completed = true;
      }
    }
    let (done, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.jobs).into_iter().partition(|j| j.completed);
    self.jobs = active;
    for job in &done {
      info!(id = %job.item.id, "jobs: download process exited");
    }
    done
  }

  pub fn jobs(&self) -> &[DownloadJob] {
    &self.jobs
  }

  pub fn active_count(&self) -> usize {
    self.jobs.len()
  }

  pub fn is_downloading(&self, id: &str) -> bool {
    self.jobs.iter().any(|j| j.item.id == id)
  }
}
