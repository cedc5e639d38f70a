//! Cancellable background work with channel-based progress.
//!
//! # Overview
//!
//! A [`BackgroundTask`] runs one unit of work on a dedicated worker thread.
//! The owner and the worker share nothing mutable:
//!
//! - The worker reports progress as [`ProgressEvent`]s over an
//!   [`std::sync::mpsc`] channel through a [`ChannelProgress`].
//! - The worker's output comes back through the thread's join handle.
//! - The only shared value is the one-way cancel flag.
//!
//! ```text
//! Idle --start--> Running --worker done--> Completed | Cancelled | Failed
//! ```
//!
//! [`ScanTask`] and [`ProbeTask`] take the [`FileSetCache`] by value and hand
//! it back in their output, so at most one piece of code can touch a cache
//! at any time.
//!
//! # Example
//!
//! ```no_run
//! use vault_revealer::scanner::FileSetCache;
//! use vault_revealer::task::{ScanTask, TaskState};
//! use std::time::Duration;
//!
//! let mut task = ScanTask::new(FileSetCache::new("/vaults/work"));
//! task.start();
//! while task.poll() == TaskState::Running {
//!     println!("{} files", task.progress().ticks_done);
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! let output = task.take_output().unwrap()?;
//! assert!(output.cache.is_ready());
//! # Ok::<(), vault_revealer::task::TaskError>(())
//! ```

use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::actions::disable::SIDECAR_SUFFIX;
use crate::correspondence::{CorrespondenceFinder, ProbeError, ProbeOutcome, ProbeResult};
use crate::progress::ProgressCallback;
use crate::scanner::{FileSetCache, ScanError, ScanSummary};

/// Lifecycle of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Created but not started.
    #[default]
    Idle,
    /// The worker is running.
    Running,
    /// The worker finished with an authoritative result.
    Completed,
    /// The worker stopped early because cancellation was requested.
    Cancelled,
    /// The worker returned an error or panicked.
    Failed,
}

impl TaskState {
    /// Whether the task has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Errors reported by the task machinery itself.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The worker thread panicked.
    #[error("background task panicked: {0}")]
    Panicked(String),
}

/// A progress message sent from a worker to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    PhaseStart { phase: String, total: usize },
    Tick { current: usize, path: String },
    PhaseEnd { phase: String },
    Message(String),
}

/// [`ProgressCallback`] that forwards every call over a channel.
///
/// Send failures are ignored: the owner may have stopped listening.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
}

impl ChannelProgress {
    #[must_use]
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        self.send(ProgressEvent::PhaseStart {
            phase: phase.to_string(),
            total,
        });
    }

    fn on_progress(&self, current: usize, path: &str) {
        self.send(ProgressEvent::Tick {
            current,
            path: path.to_string(),
        });
    }

    fn on_phase_end(&self, phase: &str) {
        self.send(ProgressEvent::PhaseEnd {
            phase: phase.to_string(),
        });
    }

    fn on_message(&self, message: &str) {
        self.send(ProgressEvent::Message(message.to_string()));
    }
}

/// Progress as seen by the owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskProgress {
    /// Items processed in the current phase
    pub ticks_done: usize,
    /// Items expected in the current phase (0 if unknown)
    pub total: usize,
    /// Current phase, or the last item or message seen
    pub description: String,
}

impl TaskProgress {
    fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PhaseStart { phase, total } => {
                self.ticks_done = 0;
                self.total = *total;
                self.description.clone_from(phase);
            }
            ProgressEvent::Tick { current, path } => {
                self.ticks_done = *current;
                self.description.clone_from(path);
            }
            ProgressEvent::PhaseEnd { .. } => {}
            ProgressEvent::Message(message) => {
                self.description.clone_from(message);
            }
        }
    }
}

fn replay(event: &ProgressEvent, callback: &dyn ProgressCallback) {
    match event {
        ProgressEvent::PhaseStart { phase, total } => callback.on_phase_start(phase, *total),
        ProgressEvent::Tick { current, path } => callback.on_progress(*current, path),
        ProgressEvent::PhaseEnd { phase } => callback.on_phase_end(phase),
        ProgressEvent::Message(message) => callback.on_message(message),
    }
}

type Work<T> = Box<dyn FnOnce(ChannelProgress) -> T + Send>;

/// Runs on the owner thread when the task starts; returns the cancel flag
/// and the work to hand to the worker.
type Prepare<T> = Box<dyn FnOnce() -> (Arc<AtomicBool>, Work<T>)>;

enum Stage<T> {
    Idle(Prepare<T>),
    Running {
        handle: JoinHandle<T>,
        events: Receiver<ProgressEvent>,
    },
    Done,
}

/// A cancellable unit of work on a background thread.
///
/// Dropping a running task cancels it and waits for the worker, so work
/// that holds a file disabled always finishes restoring it.
pub struct BackgroundTask<T: Send + 'static> {
    stage: Stage<T>,
    state: TaskState,
    cancel: Arc<AtomicBool>,
    classify: fn(&T) -> TaskState,
    progress: TaskProgress,
    output: Option<Result<T, TaskError>>,
}

impl<T: Send + 'static> std::fmt::Debug for BackgroundTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("state", &self.state)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> BackgroundTask<T> {
    fn idle(prepare: Prepare<T>, classify: fn(&T) -> TaskState) -> Self {
        Self {
            stage: Stage::Idle(prepare),
            state: TaskState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            classify,
            progress: TaskProgress::default(),
            output: None,
        }
    }

    /// Start the worker. Does nothing unless the task is Idle.
    pub fn start(&mut self) {
        let prepare = match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Idle(prepare) => prepare,
            other => {
                self.stage = other;
                return;
            }
        };

        let (cancel, work) = prepare();
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || work(ChannelProgress::new(tx)));

        self.cancel = cancel;
        self.stage = Stage::Running { handle, events: rx };
        self.state = TaskState::Running;
        log::debug!("Background task started");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Progress received so far.
    #[must_use]
    pub fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    /// Ask the worker to stop. Idempotent; only has effect while Running.
    pub fn cancel(&self) {
        if self.state == TaskState::Running {
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Drain pending progress and move to a terminal state if the worker
    /// has finished. Never blocks.
    pub fn poll(&mut self) -> TaskState {
        self.pump(None, false)
    }

    /// Like [`poll`](Self::poll), replaying each drained event onto
    /// `callback`.
    pub fn poll_with(&mut self, callback: &dyn ProgressCallback) -> TaskState {
        self.pump(Some(callback), false)
    }

    /// Block until the worker has finished.
    pub fn wait(&mut self) -> TaskState {
        self.pump(None, true)
    }

    /// Like [`wait`](Self::wait), replaying each event onto `callback`.
    pub fn wait_with(&mut self, callback: &dyn ProgressCallback) -> TaskState {
        self.pump(Some(callback), true)
    }

    /// Take the worker's output once the task is terminal.
    pub fn take_output(&mut self) -> Option<Result<T, TaskError>> {
        self.output.take()
    }

    fn pump(&mut self, callback: Option<&dyn ProgressCallback>, block: bool) -> TaskState {
        let Stage::Running { handle, events } = &self.stage else {
            return self.state;
        };

        loop {
            let event = if block {
                events.recv().ok()
            } else {
                match events.try_recv() {
                    Ok(event) => Some(event),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
                }
            };
            let Some(event) = event else { break };

            self.progress.apply(&event);
            if let Some(callback) = callback {
                replay(&event, callback);
            }
        }

        if block || handle.is_finished() {
            self.finish(callback);
        }
        self.state
    }

    fn finish(&mut self, callback: Option<&dyn ProgressCallback>) {
        let Stage::Running { handle, events } = std::mem::replace(&mut self.stage, Stage::Done)
        else {
            return;
        };

        let joined = handle.join();

        // Events sent between the last drain and the worker exiting.
        for event in events.try_iter() {
            self.progress.apply(&event);
            if let Some(callback) = callback {
                replay(&event, callback);
            }
        }

        match joined {
            Ok(output) => {
                self.state = (self.classify)(&output);
                self.output = Some(Ok(output));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Background task panicked: {}", message);
                self.state = TaskState::Failed;
                self.output = Some(Err(TaskError::Panicked(message)));
            }
        }
        log::debug!("Background task finished: {:?}", self.state);
    }
}

impl<T: Send + 'static> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        if let Stage::Running { .. } = self.stage {
            self.cancel.store(true, Ordering::SeqCst);
            self.finish(None);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Output of a [`ScanTask`].
#[derive(Debug)]
pub struct ScanOutput {
    /// The cache, Ready on success and Unscanned otherwise
    pub cache: FileSetCache,
    pub result: Result<ScanSummary, ScanError>,
}

/// Background scan of one [`FileSetCache`].
pub type ScanTask = BackgroundTask<ScanOutput>;

fn scan_state(output: &ScanOutput) -> TaskState {
    match &output.result {
        Ok(summary) if summary.interrupted => TaskState::Cancelled,
        Ok(_) => TaskState::Completed,
        Err(_) => TaskState::Failed,
    }
}

impl BackgroundTask<ScanOutput> {
    /// Create an idle scan of `cache`.
    ///
    /// The cache is prepared on the calling thread when the task starts, so
    /// a cancel issued right after [`start`](Self::start) is never lost.
    #[must_use]
    pub fn new(cache: FileSetCache) -> Self {
        let prepare: Prepare<ScanOutput> = Box::new(move || {
            let mut cache = cache;
            cache.prepare_scan();
            let cancel = cache.cancel_flag();
            let work: Work<ScanOutput> = Box::new(move |progress: ChannelProgress| {
                let result = cache.run_scan(Some(&progress));
                ScanOutput { cache, result }
            });
            (cancel, work)
        });
        Self::idle(prepare, scan_state)
    }
}

/// Settings for a [`ProbeTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Suffix used to disable the selected file
    pub suffix: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            suffix: SIDECAR_SUFFIX.to_string(),
        }
    }
}

/// Output of a [`ProbeTask`].
#[derive(Debug)]
pub struct ProbeOutput {
    /// The target cache, unchanged
    pub cache: FileSetCache,
    pub result: Result<ProbeResult, ProbeError>,
}

/// Background probe of one selected file against a Ready cache.
pub type ProbeTask = BackgroundTask<ProbeOutput>;

fn probe_state(output: &ProbeOutput) -> TaskState {
    match &output.result {
        Ok(result) if result.outcome() == ProbeOutcome::Cancelled => TaskState::Cancelled,
        Ok(_) => TaskState::Completed,
        Err(_) => TaskState::Failed,
    }
}

impl BackgroundTask<ProbeOutput> {
    /// Create an idle probe of `selected` against `cache`.
    #[must_use]
    pub fn new(selected: PathBuf, cache: FileSetCache, settings: ProbeSettings) -> Self {
        let prepare: Prepare<ProbeOutput> = Box::new(move || {
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&cancel);
            let work: Work<ProbeOutput> = Box::new(move |progress: ChannelProgress| {
                let finder = CorrespondenceFinder::new()
                    .with_suffix(settings.suffix)
                    .with_cancel_flag(flag)
                    .with_progress_callback(Arc::new(progress));
                let result = finder.find_corresponding(&selected, &cache);
                ProbeOutput { cache, result }
            });
            (cancel, work)
        });
        Self::idle(prepare, probe_state)
    }
}
