//! Scanner module for building the list of known files under a root.
//!
//! This module provides functionality for:
//! - Ordered, cancellable directory walking using walkdir
//! - The [`FileSetCache`] snapshot a probe compares against
//! - Unicode path normalization
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`cache`]: The per-root listing with its Unscanned/Scanning/Ready state
//! - [`path_utils`]: NFC normalization for path comparison
//!
//! # Example
//!
//! ```no_run
//! use vault_revealer::scanner::FileSetCache;
//!
//! let mut cache = FileSetCache::new("/mnt/vault-unlocked");
//! let summary = cache.scan(None).unwrap();
//! println!("{} known files", summary.files);
//! assert!(cache.is_ready());
//! ```

pub mod cache;
pub mod path_utils;
pub mod walker;

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use cache::{CacheState, FileSetCache, ScanSummary};
pub use walker::Walker;

/// A regular file discovered under a scanned root.
///
/// Carries both the absolute path (what gets probed and revealed) and the
/// path relative to the root it was found under (what gets displayed).
/// Equality and hashing only consider the absolute path.
#[derive(Debug, Clone, Serialize)]
pub struct KnownFile {
    /// Absolute path to the file
    path: PathBuf,
    /// Path relative to the scanned root
    relative: PathBuf,
}

impl KnownFile {
    /// Create a new KnownFile for `path` found under `root`.
    ///
    /// If `path` is not inside `root` the relative path falls back to the
    /// full path.
    #[must_use]
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative = path
            .strip_prefix(root)
            .map_or_else(|_| path.clone(), Path::to_path_buf);
        Self { path, relative }
    }

    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the file relative to its root.
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Consume the entry, returning the absolute path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl PartialEq for KnownFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for KnownFile {}

impl Hash for KnownFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The configured root does not exist.
    #[error("Root not found: {0}")]
    RootNotFound(PathBuf),

    /// The configured root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::RootNotFound(p)
            | Self::NotADirectory(p)
            | Self::PermissionDenied(p)
            | Self::Io { path: p, .. } => p,
        }
    }
}
