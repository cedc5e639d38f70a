//! Rename-based disabling of a single file.
//!
//! # Overview
//!
//! Disabling a file means renaming it to `<name><suffix>` so that the
//! encryption layer no longer recognises it. For an encrypted `.c9r` file the
//! vault stops presenting its decrypted counterpart; for a decrypted file the
//! vault removes its encrypted counterpart. Nothing is read or written, and
//! the rename is undone as soon as the probe is over.
//!
//! # Safety
//!
//! [`DisableGuard`] owns the disabled state:
//! - Acquisition refuses to run if the sidecar name is already taken.
//! - [`DisableGuard::restore`] renames the sidecar back and reports failure.
//! - `Drop` performs the same restoration if `restore` was never called
//!   (early return, `?`, panic unwinding). A failure there can only be
//!   logged, so callers should prefer `restore`.
//!
//! If anything goes wrong, the disabled file can be recovered by hand by
//! removing the suffix from its name.
//!
//! # Example
//!
//! ```no_run
//! use vault_revealer::actions::disable::DisableGuard;
//! use std::path::Path;
//!
//! let guard = DisableGuard::disable(Path::new("/vault/d/AB/CDEF/name.c9r"))?;
//! // ... inspect the other tree while the file is sidestepped ...
//! guard.restore()?;
//! # Ok::<(), vault_revealer::actions::disable::DisableError>(())
//! ```

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Suffix appended to a disabled file's name.
pub const SIDECAR_SUFFIX: &str = ".cvfr-sidestepped";

/// Error type for disable and restore operations.
#[derive(Debug, Error)]
pub enum DisableError {
    /// The file to disable does not exist (or is not a regular file).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The sidecar name is already taken; nothing was renamed.
    #[error("sidecar already exists: {sidecar} - remove or rename it before probing {path}")]
    Conflict { path: PathBuf, sidecar: PathBuf },

    /// The disabling rename failed; the file was not disabled.
    #[error("failed to disable {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be renamed back. It is still sidestepped on disk.
    #[error("failed to restore {path} from {sidecar}: {source} - rename it back manually")]
    RestoreFailed {
        path: PathBuf,
        sidecar: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DisableError {
    /// Get the original path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::Conflict { path: p, .. }
            | Self::Io { path: p, .. }
            | Self::RestoreFailed { path: p, .. } => p,
        }
    }

    /// Whether this error leaves a file sidestepped on disk.
    #[must_use]
    pub fn is_restore_failure(&self) -> bool {
        matches!(self, Self::RestoreFailed { .. })
    }
}

/// How a guard's restoration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    /// The sidecar was renamed back to the original name.
    Restored,
    /// The sidecar was already gone; treated as restored.
    AlreadyRestored,
}

/// Compute the sidecar path for `path` with the given suffix.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use vault_revealer::actions::disable::{sidecar_path, SIDECAR_SUFFIX};
///
/// assert_eq!(
///     sidecar_path(Path::new("/vault/a.c9r"), SIDECAR_SUFFIX),
///     PathBuf::from("/vault/a.c9r.cvfr-sidestepped"),
/// );
/// ```
#[must_use]
pub fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// A file that is currently disabled. Restores it when dropped.
#[derive(Debug)]
pub struct DisableGuard {
    target: PathBuf,
    sidecar: PathBuf,
    active: bool,
}

impl DisableGuard {
    /// Disable `path` using [`SIDECAR_SUFFIX`].
    ///
    /// # Errors
    ///
    /// See [`disable_with_suffix`](Self::disable_with_suffix).
    pub fn disable(path: &Path) -> Result<Self, DisableError> {
        Self::disable_with_suffix(path, SIDECAR_SUFFIX)
    }

    /// Disable `path` by renaming it to `path + suffix`.
    ///
    /// # Errors
    ///
    /// - [`DisableError::NotFound`] if `path` is not an existing regular file.
    /// - [`DisableError::Conflict`] if the sidecar already exists. Neither
    ///   path is touched.
    /// - [`DisableError::Io`] if the rename fails. No guard exists and
    ///   nothing needs restoring.
    pub fn disable_with_suffix(path: &Path, suffix: &str) -> Result<Self, DisableError> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(DisableError::NotFound(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DisableError::NotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(DisableError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        }

        let sidecar = sidecar_path(path, suffix);
        if entry_exists(&sidecar) {
            log::warn!("Sidecar already exists: {}", sidecar.display());
            return Err(DisableError::Conflict {
                path: path.to_path_buf(),
                sidecar,
            });
        }

        fs::rename(path, &sidecar).map_err(|e| DisableError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        log::debug!("Disabled {} -> {}", path.display(), sidecar.display());

        Ok(Self {
            target: path.to_path_buf(),
            sidecar,
            active: true,
        })
    }

    /// The original path of the disabled file.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Where the file currently lives.
    #[must_use]
    pub fn sidecar(&self) -> &Path {
        &self.sidecar
    }

    /// Whether the guard still owes a restoration.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore the file and consume the guard.
    ///
    /// # Errors
    ///
    /// Returns [`DisableError::RestoreFailed`] if the sidecar exists but
    /// cannot be renamed back, or if the original path has been reoccupied
    /// in the meantime (the guard never overwrites it).
    pub fn restore(mut self) -> Result<RestoreStatus, DisableError> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<RestoreStatus, DisableError> {
        if !self.active {
            return Ok(RestoreStatus::AlreadyRestored);
        }
        self.active = false;

        if !entry_exists(&self.sidecar) {
            log::debug!(
                "Sidecar {} already gone, treating {} as restored",
                self.sidecar.display(),
                self.target.display()
            );
            return Ok(RestoreStatus::AlreadyRestored);
        }

        if entry_exists(&self.target) {
            return Err(self.restore_failed(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "original path was recreated while disabled",
            )));
        }

        match fs::rename(&self.sidecar, &self.target) {
            Ok(()) => {
                log::debug!("Restored {}", self.target.display());
                Ok(RestoreStatus::Restored)
            }
            Err(e) => Err(self.restore_failed(e)),
        }
    }

    fn restore_failed(&self, source: io::Error) -> DisableError {
        log::error!(
            "Could not restore {} (file is still at {}): {}",
            self.target.display(),
            self.sidecar.display(),
            source
        );
        DisableError::RestoreFailed {
            path: self.target.clone(),
            sidecar: self.sidecar.clone(),
            source,
        }
    }
}

impl Drop for DisableGuard {
    fn drop(&mut self) {
        if self.active {
            log::debug!("DisableGuard dropped while active, restoring {}", self.target.display());
            // restore_inner already logs failures at error level
            let _ = self.restore_inner();
        }
    }
}
