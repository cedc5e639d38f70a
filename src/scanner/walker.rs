//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a root and
//! yielding every regular file below it as a [`KnownFile`].
//!
//! # Features
//!
//! - Deterministic order: directory entries are sorted by file name
//! - Symbolic links are never followed and never reported as files
//! - Directories and special files (sockets, FIFOs, devices) are skipped
//! - Cancellation via an atomic flag, checked before every entry is read
//! - Per-entry errors are yielded rather than stopping iteration
//!
//! # Example
//!
//! ```no_run
//! use vault_revealer::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/mnt/vault-locked"));
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}", file.relative().display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{KnownFile, ScanError};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Optional cancellation flag
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            cancel_flag: None,
        }
    }

    /// Set the cancellation flag.
    ///
    /// When the flag is set to `true`, the walk ends before the next
    /// filesystem entry is read.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Root this walker enumerates.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_cancel_requested(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. The iterator is finite and cannot be restarted; walk
    /// again to get a fresh listing.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vault_revealer::scanner::Walker;
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."));
    /// let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn walk(&self) -> Walk<'_> {
        let inner = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        Walk {
            walker: self,
            inner,
            cancelled: false,
        }
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: PathBuf, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            ErrorKind::NotFound if path == self.root => ScanError::RootNotFound(path),
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path,
                    source: error,
                }
            }
        }
    }

    /// Handle walkdir errors.
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Filesystem loop at {} (ancestor {})",
                path.display(),
                ancestor.display()
            );
        }

        self.handle_io_error(path, error.into())
    }
}

/// Iterator returned by [`Walker::walk`].
pub struct Walk<'a> {
    walker: &'a Walker,
    inner: walkdir::IntoIter,
    cancelled: bool,
}

impl Walk<'_> {
    /// Whether the walk stopped because cancellation was requested.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<KnownFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancelled {
                return None;
            }

            if self.walker.is_cancel_requested() {
                log::debug!(
                    "Walker: cancellation requested, stopping walk of {}",
                    self.walker.root.display()
                );
                self.cancelled = true;
                return None;
            }

            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(self.walker.handle_walk_error(e))),
            };

            let file_type = entry.file_type();

            if file_type.is_dir() {
                continue;
            }

            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", entry.path().display());
                continue;
            }

            if !file_type.is_file() {
                log::trace!("Skipping special file: {}", entry.path().display());
                continue;
            }

            return Some(Ok(KnownFile::new(&self.walker.root, entry.into_path())));
        }
    }
}
