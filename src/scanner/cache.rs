//! Cached listing of the known files under one root.
//!
//! A [`FileSetCache`] is the "expected" side of a probe: a snapshot of every
//! regular file under a root, taken before anything is disabled. It is never
//! live-tracked. If the tree changes after the scan, the cache is simply
//! stale, and a probe against it can only report that nothing matched.
//!
//! # State
//!
//! ```text
//! Unscanned --prepare_scan--> Scanning --run_scan--> Ready
//!     ^                           |
//!     +------ cancelled ----------+
//!     +------ set_root / invalidate (from any state)
//! ```
//!
//! Entries are only exposed while the cache is [`CacheState::Ready`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{KnownFile, ScanError, Walker};
use crate::progress::ProgressCallback;

/// Progress phase name used by scans.
pub const SCAN_PHASE: &str = "scan";

/// Scan state of a [`FileSetCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No authoritative listing exists.
    Unscanned,
    /// A scan is in progress.
    Scanning,
    /// The listing is complete.
    Ready,
}

/// Statistics from a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Number of files discovered
    pub files: usize,
    /// Number of entries that could not be read (logged, skipped)
    pub errors: usize,
    /// Whether the scan was cancelled before completion
    pub interrupted: bool,
    /// Wall time spent walking
    pub duration: Duration,
}

/// The enumerated file listing of one root.
#[derive(Debug)]
pub struct FileSetCache {
    root: PathBuf,
    entries: Vec<KnownFile>,
    state: CacheState,
    cancel: Arc<AtomicBool>,
}

impl FileSetCache {
    /// Create an unscanned cache for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
            state: CacheState::Unscanned,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configured root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Point the cache at a different root.
    ///
    /// Always invalidates, even when the new root equals the old one, so
    /// re-selecting a folder forces a fresh listing.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
        self.invalidate();
    }

    /// Drop the listing and return to [`CacheState::Unscanned`].
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.state = CacheState::Unscanned;
    }

    /// Current scan state.
    #[must_use]
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Whether the listing is complete.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == CacheState::Ready
    }

    /// The known files in scan order, or `None` unless the cache is Ready.
    #[must_use]
    pub fn entries(&self) -> Option<&[KnownFile]> {
        self.is_ready().then_some(self.entries.as_slice())
    }

    /// Number of known files (zero unless Ready).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().map_or(0, <[KnownFile]>::len)
    }

    /// Whether the cache holds no known files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared cancellation flag for the running scan.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Ask a running scan to stop at the next entry.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested since the last
    /// [`prepare_scan`](Self::prepare_scan).
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Discard any previous listing and enter [`CacheState::Scanning`].
    ///
    /// Clears the cancel flag. Background tasks call this on the owning
    /// thread before handing the cache to a worker, so a cancel issued
    /// right after the task starts is never lost.
    pub fn prepare_scan(&mut self) {
        self.entries.clear();
        self.cancel.store(false, Ordering::SeqCst);
        self.state = CacheState::Scanning;
    }

    /// Walk the root and fill the listing.
    ///
    /// Expects [`prepare_scan`](Self::prepare_scan) to have been called; a
    /// cache in any other state is prepared first. Each discovered file is
    /// reported to `progress` as one tick.
    ///
    /// # Errors
    ///
    /// - [`ScanError::RootNotFound`] if the root does not exist; a missing
    ///   root is never treated as an empty tree.
    /// - [`ScanError::NotADirectory`] if the root is a file.
    /// - [`ScanError::Io`] if the root cannot be inspected or made absolute.
    ///
    /// Errors below the root are logged and counted in
    /// [`ScanSummary::errors`]. On error or cancellation the cache is left
    /// Unscanned.
    pub fn run_scan(
        &mut self,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<ScanSummary, ScanError> {
        if self.state != CacheState::Scanning {
            self.prepare_scan();
        }

        let result = self.walk_into_entries(progress);
        match &result {
            Ok(summary) if !summary.interrupted => {
                self.state = CacheState::Ready;
            }
            _ => self.invalidate(),
        }
        result
    }

    /// Convenience for [`prepare_scan`](Self::prepare_scan) followed by
    /// [`run_scan`](Self::run_scan).
    pub fn scan(
        &mut self,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<ScanSummary, ScanError> {
        self.prepare_scan();
        self.run_scan(progress)
    }

    fn walk_into_entries(
        &mut self,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<ScanSummary, ScanError> {
        let root = resolve_root(&self.root)?;
        let started = Instant::now();

        log::info!("Scanning {}", root.display());
        if let Some(callback) = progress {
            callback.on_phase_start(SCAN_PHASE, 0);
        }

        let walker = Walker::new(&root).with_cancel_flag(self.cancel_flag());
        let mut walk = walker.walk();
        let mut summary = ScanSummary::default();

        for item in walk.by_ref() {
            match item {
                Ok(file) => {
                    summary.files += 1;
                    if let Some(callback) = progress {
                        callback.on_progress(summary.files, &file.path().to_string_lossy());
                    }
                    self.entries.push(file);
                }
                Err(ScanError::RootNotFound(path)) => {
                    // Removed between the check and the walk.
                    return Err(ScanError::RootNotFound(path));
                }
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    summary.errors += 1;
                }
            }
        }

        summary.interrupted = walk.was_cancelled();
        summary.duration = started.elapsed();

        if let Some(callback) = progress {
            callback.on_phase_end(SCAN_PHASE);
        }

        if summary.interrupted {
            log::info!(
                "Scan of {} cancelled after {} files",
                root.display(),
                summary.files
            );
        } else {
            log::info!(
                "Scan of {} complete: {} files, {} unreadable entries in {:.2?}",
                root.display(),
                summary.files,
                summary.errors,
                summary.duration
            );
        }

        Ok(summary)
    }
}

/// Check that `root` is an existing directory and make it absolute.
fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ScanError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }
        Err(e) => {
            return Err(ScanError::Io {
                path: root.to_path_buf(),
                source: e,
            });
        }
    }

    std::path::absolute(root).map_err(|e| ScanError::Io {
        path: root.to_path_buf(),
        source: e,
    })
}
