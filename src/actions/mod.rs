//! File actions module.
//!
//! The only action the core ever performs on disk is temporarily disabling
//! one file by renaming it, see [`disable`]:
//! - Rename to a sidecar name with a fixed suffix
//! - Guaranteed rename-back on every exit path
//! - Conflict detection when the sidecar name is taken
//!
//! ```no_run
//! use vault_revealer::actions::DisableGuard;
//! use std::path::Path;
//!
//! let guard = DisableGuard::disable(Path::new("/mnt/vault/report.pdf")).unwrap();
//! guard.restore().unwrap();
//! ```

pub mod disable;

pub use disable::{sidecar_path, DisableError, DisableGuard, RestoreStatus, SIDECAR_SUFFIX};
