//! Reveal session state.
//!
//! A [`RevealSession`] holds the two roots a user works with (the locked
//! vault directory with encrypted files and the unlocked mount with
//! decrypted files) together with their listings, and the direction of the
//! current reveal. Operations receive the session explicitly; there is no
//! process-wide selection.
//!
//! Listings are lent out by value to background tasks with
//! [`RevealSession::take_target_cache`] and handed back with
//! [`RevealSession::put_target_cache`]. A root changed while its cache is
//! lent out is applied when the cache comes back.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::path_utils::is_under;
use crate::scanner::FileSetCache;

/// Which side the user selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// A decrypted file was selected; reveal its encrypted counterpart.
    #[default]
    RevealEncrypted,
    /// An encrypted file was selected; reveal its decrypted counterpart.
    RevealDecrypted,
}

impl Direction {
    /// Label for the kind of file the user selected.
    #[must_use]
    pub fn selected_label(self) -> &'static str {
        match self {
            Self::RevealEncrypted => "decrypted",
            Self::RevealDecrypted => "encrypted",
        }
    }

    /// Label for the kind of file being revealed.
    #[must_use]
    pub fn revealed_label(self) -> &'static str {
        match self {
            Self::RevealEncrypted => "encrypted",
            Self::RevealDecrypted => "decrypted",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.selected_label(),
            self.revealed_label()
        )
    }
}

/// One root and its listing.
#[derive(Debug, Default)]
struct Side {
    root: Option<PathBuf>,
    /// `None` while unconfigured or lent to a task.
    cache: Option<FileSetCache>,
}

impl Side {
    fn set_root(&mut self, root: PathBuf) {
        match self.cache.as_mut() {
            Some(cache) => cache.set_root(root.clone()),
            None if self.root.is_none() => self.cache = Some(FileSetCache::new(root.clone())),
            None => {}
        }
        self.root = Some(root);
    }

    fn take(&mut self) -> Option<FileSetCache> {
        self.cache.take()
    }

    fn put(&mut self, mut cache: FileSetCache) {
        if let Some(root) = &self.root {
            if cache.root() != root.as_path() {
                log::debug!(
                    "Root changed to {} while its listing was in use, invalidating",
                    root.display()
                );
                cache.set_root(root.clone());
            }
        }
        self.cache = Some(cache);
    }
}

/// The state of one reveal session.
#[derive(Debug, Default)]
pub struct RevealSession {
    locked: Side,
    unlocked: Side,
    direction: Direction,
}

impl RevealSession {
    /// Create an empty session.
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// Current direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Change the direction. Both listings are kept.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Set the locked vault root (encrypted files). Invalidates its listing.
    pub fn set_locked_root(&mut self, root: impl Into<PathBuf>) {
        self.locked.set_root(root.into());
    }

    /// Set the unlocked mount root (decrypted files). Invalidates its listing.
    pub fn set_unlocked_root(&mut self, root: impl Into<PathBuf>) {
        self.unlocked.set_root(root.into());
    }

    /// The locked vault root, if configured.
    #[must_use]
    pub fn locked_root(&self) -> Option<&Path> {
        self.locked.root.as_deref()
    }

    /// The unlocked mount root, if configured.
    #[must_use]
    pub fn unlocked_root(&self) -> Option<&Path> {
        self.unlocked.root.as_deref()
    }

    fn source(&self) -> &Side {
        match self.direction {
            Direction::RevealEncrypted => &self.unlocked,
            Direction::RevealDecrypted => &self.locked,
        }
    }

    fn target(&self) -> &Side {
        match self.direction {
            Direction::RevealEncrypted => &self.locked,
            Direction::RevealDecrypted => &self.unlocked,
        }
    }

    fn target_mut(&mut self) -> &mut Side {
        match self.direction {
            Direction::RevealEncrypted => &mut self.locked,
            Direction::RevealDecrypted => &mut self.unlocked,
        }
    }

    /// Root the selected files come from.
    #[must_use]
    pub fn source_root(&self) -> Option<&Path> {
        self.source().root.as_deref()
    }

    /// Root searched for the corresponding file.
    #[must_use]
    pub fn target_root(&self) -> Option<&Path> {
        self.target().root.as_deref()
    }

    /// The target listing, unless unconfigured or lent out.
    #[must_use]
    pub fn target_cache(&self) -> Option<&FileSetCache> {
        self.target().cache.as_ref()
    }

    /// Borrow the target listing mutably, unless unconfigured or lent out.
    pub fn target_cache_mut(&mut self) -> Option<&mut FileSetCache> {
        self.target_mut().cache.as_mut()
    }

    /// Lend the target listing to a task.
    pub fn take_target_cache(&mut self) -> Option<FileSetCache> {
        self.target_mut().take()
    }

    /// Hand a listing back after a task finished.
    pub fn put_target_cache(&mut self, cache: FileSetCache) {
        self.target_mut().put(cache);
    }

    /// Replace a listing lost to a failed task with a fresh, unscanned one.
    pub fn reset_target_cache(&mut self) {
        let side = self.target_mut();
        if let Some(root) = side.root.clone() {
            side.cache = Some(FileSetCache::new(root));
        }
    }

    /// Whether `selected` lies under the source root.
    ///
    /// Returns `true` when no source root is configured. Only a hint: a
    /// file outside the source root can still be probed, it just cannot
    /// have a counterpart in the target.
    #[must_use]
    pub fn is_in_source(&self, selected: &Path) -> bool {
        let Some(root) = self.source_root() else {
            return true;
        };
        is_under(selected, root)
    }
}
