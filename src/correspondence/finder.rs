//! Correspondence detection by side-effect probing.
//!
//! # Overview
//!
//! [`CorrespondenceFinder::find_corresponding`] never looks inside the
//! encryption format. It perturbs the system and watches what happens:
//!
//! 1. Take the Ready listing of the *other* tree as the expected set.
//! 2. Disable the selected file with a [`DisableGuard`].
//! 3. Re-check every expected file, in listing order, against the live
//!    filesystem. The first one that is gone is the file the encryption
//!    layer withdrew because its counterpart was disabled.
//! 4. Restore the selected file, on every path out of step 3.
//!
//! This is only sound when disabling one file withdraws exactly one file on
//! the other side. Folder entries in an encrypted tree may withdraw a whole
//! subtree; in that case the first missing entry in listing order is
//! returned and no uniqueness check is made.
//!
//! # Example
//!
//! ```no_run
//! use vault_revealer::correspondence::CorrespondenceFinder;
//! use vault_revealer::scanner::FileSetCache;
//! use std::path::Path;
//!
//! let mut encrypted = FileSetCache::new("/vaults/work");
//! encrypted.scan(None)?;
//!
//! let finder = CorrespondenceFinder::new();
//! let result = finder.find_corresponding(Path::new("/mnt/work/report.pdf"), &encrypted)?;
//! if let Some(file) = result.corresponding() {
//!     println!("{}", file.path().display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::outcome::ProbeResult;
use super::PROBE_PHASE;
use crate::actions::disable::{DisableError, DisableGuard, RestoreStatus, SIDECAR_SUFFIX};
use crate::progress::ProgressCallback;
use crate::scanner::path_utils::{canonical_location, path_key};
use crate::scanner::{CacheState, FileSetCache, KnownFile};

/// Errors that can occur during a probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The target listing has not been scanned (or the scan was cancelled).
    #[error("target listing is not ready ({0:?}); scan the target root first")]
    CacheNotReady(CacheState),

    /// The selected file could not be disabled. Nothing was changed on disk.
    #[error(transparent)]
    Disable(DisableError),

    /// Checking a known file failed; the probe was aborted.
    #[error("failed to check {path}: {source}")]
    Check {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The selected file could not be restored after probing.
    ///
    /// Takes priority over whatever the probe itself returned; that error,
    /// if any, is kept in `probe_error`.
    #[error("{source}")]
    RestoreFailure {
        #[source]
        source: DisableError,
        probe_error: Option<Box<ProbeError>>,
    },
}

impl ProbeError {
    /// Whether this error leaves the selected file sidestepped on disk.
    #[must_use]
    pub fn is_restore_failure(&self) -> bool {
        matches!(self, Self::RestoreFailure { .. })
    }

    /// Where the selected file was left, if it could not be restored.
    #[must_use]
    pub fn stranded_sidecar(&self) -> Option<&Path> {
        match self {
            Self::RestoreFailure {
                source: DisableError::RestoreFailed { sidecar, .. },
                ..
            } => Some(sidecar),
            _ => None,
        }
    }
}

impl From<DisableError> for ProbeError {
    fn from(err: DisableError) -> Self {
        if err.is_restore_failure() {
            Self::RestoreFailure {
                source: err,
                probe_error: None,
            }
        } else {
            Self::Disable(err)
        }
    }
}

/// Live existence check used while a file is disabled.
pub trait PathProbe: Send + Sync {
    /// Whether `path` currently exists as a regular file.
    ///
    /// # Errors
    ///
    /// Any I/O error other than "does not exist" aborts the probe.
    fn is_present(&self, path: &Path) -> io::Result<bool>;
}

/// [`PathProbe`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn is_present(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Outcome of walking the expected set while the guard is held.
struct Search {
    found: Option<KnownFile>,
    checked: usize,
    cancelled: bool,
}

/// Finds the file in one tree that corresponds to a file in another.
pub struct CorrespondenceFinder<P: PathProbe = FsProbe> {
    probe: P,
    suffix: String,
    cancel_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl<P: PathProbe + std::fmt::Debug> std::fmt::Debug for CorrespondenceFinder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrespondenceFinder")
            .field("probe", &self.probe)
            .field("suffix", &self.suffix)
            .field("cancel_flag", &self.cancel_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl CorrespondenceFinder<FsProbe> {
    /// Create a finder that checks the real filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_probe(FsProbe)
    }
}

impl Default for CorrespondenceFinder<FsProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PathProbe> CorrespondenceFinder<P> {
    /// Create a finder with a custom existence check.
    #[must_use]
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe,
            suffix: SIDECAR_SUFFIX.to_string(),
            cancel_flag: None,
            progress_callback: None,
        }
    }

    /// Set the sidecar suffix used to disable the selected file.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the cancellation flag, checked before every known file.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_cancel_requested(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Find the file in `target` that corresponds to `selected`.
    ///
    /// `target` must already be scanned; scanning is left to the caller so
    /// scan progress and probe progress can be shown separately.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::CacheNotReady`] if `target` is not Ready.
    /// - [`ProbeError::Disable`] if `selected` does not exist or its sidecar
    ///   name is taken. No probe was started.
    /// - [`ProbeError::Check`] if a known file could not be checked. The
    ///   selected file has been restored.
    /// - [`ProbeError::RestoreFailure`] if the selected file could not be
    ///   restored. Reported in preference to any other error.
    pub fn find_corresponding(
        &self,
        selected: &Path,
        target: &FileSetCache,
    ) -> Result<ProbeResult, ProbeError> {
        let expected = target
            .entries()
            .ok_or(ProbeError::CacheNotReady(target.state()))?;

        let selected_abs = std::path::absolute(selected).unwrap_or_else(|_| selected.to_path_buf());
        let skip_key = key_within(&selected_abs, target.root());

        log::info!(
            "Probing {} against {} known files under {}",
            selected_abs.display(),
            expected.len(),
            target.root().display()
        );

        let guard = DisableGuard::disable_with_suffix(&selected_abs, &self.suffix)?;

        let search = self.search(expected, skip_key.as_deref());

        match guard.restore() {
            Ok(RestoreStatus::Restored) => {}
            Ok(RestoreStatus::AlreadyRestored) => {
                log::warn!(
                    "{} was restored by someone else during the probe",
                    selected_abs.display()
                );
            }
            Err(restore) => {
                return Err(ProbeError::RestoreFailure {
                    source: restore,
                    probe_error: search.err().map(Box::new),
                });
            }
        }

        let search = search?;
        let result = match search.found {
            Some(file) => {
                log::info!("Corresponding file: {}", file.path().display());
                ProbeResult::found(selected_abs, file, search.checked)
            }
            None if search.cancelled => {
                log::info!("Probe cancelled after {} files", search.checked);
                ProbeResult::cancelled(selected_abs, search.checked)
            }
            None => {
                log::info!("No known file disappeared ({} checked)", search.checked);
                ProbeResult::not_found(selected_abs, search.checked)
            }
        };

        Ok(result)
    }

    fn search(&self, expected: &[KnownFile], skip_key: Option<&str>) -> Result<Search, ProbeError> {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PROBE_PHASE, expected.len());
        }

        let result = self.search_inner(expected, skip_key);

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PROBE_PHASE);
        }

        result
    }

    fn search_inner(&self, expected: &[KnownFile], skip_key: Option<&str>) -> Result<Search, ProbeError> {
        let mut search = Search {
            found: None,
            checked: 0,
            cancelled: false,
        };

        for file in expected {
            if self.is_cancel_requested() {
                log::debug!("Probe: cancellation requested, stopping");
                search.cancelled = true;
                break;
            }

            if skip_key.is_some_and(|key| path_key(file.relative()) == key) {
                log::debug!("Skipping the disabled file itself: {}", file.path().display());
                continue;
            }

            search.checked += 1;
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(search.checked, &file.path().to_string_lossy());
            }

            let present = self.probe.is_present(file.path()).map_err(|e| ProbeError::Check {
                path: file.path().to_path_buf(),
                source: e,
            })?;

            if !present {
                search.found = Some(file.clone());
                break;
            }
        }

        Ok(search)
    }
}

/// Root-relative key of `selected` if it lies inside `root`, comparing
/// resolved locations so `..` segments and symlinked directories in either
/// path do not hide the match.
fn key_within(selected: &Path, root: &Path) -> Option<String> {
    let selected = canonical_location(selected)?;
    let root = fs::canonicalize(root).ok()?;
    selected.strip_prefix(&root).ok().map(path_key)
}
