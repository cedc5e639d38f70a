//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ProgressCallback`] trait the scanner and the
//! probe report through, and the [`Progress`] struct which renders those
//! reports as terminal progress bars.
//!
//! Background tasks never touch a [`Progress`] directly: the worker reports
//! to a [`crate::task::ChannelProgress`], and the owning thread replays the
//! received events onto its renderer.
//!
//! # Accessible Mode
//!
//! When accessible mode is enabled, progress reporting uses simplified output:
//! - No spinners or animations
//! - ASCII-only bars
//! - Reduced update frequency for screen reader compatibility

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::correspondence::PROBE_PHASE;
use crate::scanner::cache::SCAN_PHASE;

/// Progress callback for scanning and probing.
///
/// Implement this trait to receive progress updates from
/// [`crate::scanner::FileSetCache::run_scan`] and
/// [`crate::correspondence::CorrespondenceFinder::find_corresponding`].
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ("scan" or "probe")
    /// * `total` - Total number of items, or 0 when unknown up front
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    scan: Mutex<Option<ProgressBar>>,
    probe: Mutex<Option<ProgressBar>>,
    quiet: bool,
    accessible: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use vault_revealer::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_accessible(quiet, false)
    }

    /// Create a new progress reporter with accessible mode.
    ///
    /// ```
    /// use vault_revealer::progress::Progress;
    ///
    /// let progress = Progress::with_accessible(false, true);
    /// assert!(progress.is_accessible());
    /// ```
    #[must_use]
    pub fn with_accessible(quiet: bool, accessible: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            scan: Mutex::new(None),
            probe: Mutex::new(None),
            quiet,
            accessible,
        }
    }

    /// Check if accessible mode is enabled.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Style for the scan phase (spinner, total unknown).
    fn scan_style(&self) -> ProgressStyle {
        if self.accessible {
            ProgressStyle::with_template("{msg} [{elapsed_precise}] {pos} files")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        }
    }

    /// Style for the probe phase (bar over the known files).
    fn probe_style(&self) -> ProgressStyle {
        if self.accessible {
            ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        lock(&self.probe)
            .clone()
            .or_else(|| lock(&self.scan).clone())
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            SCAN_PHASE => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(self.scan_style());
                pb.set_message("Listing known files");
                let tick_rate = if self.accessible { 500 } else { 100 };
                pb.enable_steady_tick(Duration::from_millis(tick_rate));
                *lock(&self.scan) = Some(pb);
            }
            PROBE_PHASE => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(self.probe_style());
                pb.set_message("Probing");
                *lock(&self.probe) = Some(pb);
            }
            _ => {
                log::debug!("Unknown progress phase: {}", phase);
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active_bar() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        match phase {
            SCAN_PHASE => {
                if let Some(pb) = lock(&self.scan).take() {
                    pb.finish_with_message("Listing complete");
                }
            }
            PROBE_PHASE => {
                if let Some(pb) = lock(&self.probe).take() {
                    pb.finish_and_clear();
                }
            }
            _ => {}
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active_bar() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
