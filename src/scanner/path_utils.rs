//! Path comparison across Unicode normalization forms.
//!
//! An unlocked vault is usually reached through a virtual drive or FUSE
//! mount. On macOS that mount reports names in NFD while a path typed by
//! the user or returned by a file picker is NFC, so one visible name can
//! have two byte representations:
//!
//! - NFC: `café.txt`, 'é' is U+00E9
//! - NFD: `café.txt`, 'e' U+0065 followed by U+0301
//!
//! Every comparison between a selected file and a scanned entry goes
//! through this module.
//!
//! ```
//! use std::path::Path;
//! use vault_revealer::scanner::path_utils::path_key;
//!
//! assert_eq!(
//!     path_key(Path::new("/mnt/café.txt")),
//!     path_key(Path::new("/mnt/cafe\u{0301}.txt")),
//! );
//! ```

use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Normalize a [`Path`] to NFC. Non-UTF-8 paths are returned unchanged.
#[must_use]
pub fn normalize_pathbuf(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(normalize_path_str(s)),
        None => path.to_path_buf(),
    }
}

/// Equality key for a path. Invalid UTF-8 is converted lossily.
#[must_use]
pub fn path_key(path: &Path) -> String {
    normalize_path_str(&path.to_string_lossy())
}

/// Absolute, NFC form of `path`. Falls back to `path` itself when the
/// working directory cannot be read.
#[must_use]
pub fn comparable(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_pathbuf(&abs)
}

/// `path` with its parent directory resolved through the filesystem
/// (`..`, `.` and symlinked directories), keeping the final component
/// as written. `None` if the parent cannot be resolved.
#[must_use]
pub fn canonical_location(path: &Path) -> Option<PathBuf> {
    let abs = std::path::absolute(path).ok()?;
    let name = abs.file_name()?;
    let parent = abs.parent()?;
    Some(std::fs::canonicalize(parent).ok()?.join(name))
}

/// Whether `path` lies under `root`, component-wise, after normalization.
///
/// ```
/// use std::path::Path;
/// use vault_revealer::scanner::path_utils::is_under;
///
/// assert!(is_under(Path::new("/mnt/cafe\u{0301}/a"), Path::new("/mnt/café")));
/// assert!(!is_under(Path::new("/mnt/café2/a"), Path::new("/mnt/café")));
/// ```
#[must_use]
pub fn is_under(path: &Path, root: &Path) -> bool {
    comparable(path).starts_with(comparable(root))
}
