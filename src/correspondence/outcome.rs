//! Result types produced by a probe.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::KnownFile;

/// How a probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// A known file disappeared while the selected file was disabled.
    Found,
    /// Every known file was checked and all of them were still present.
    NotFound,
    /// The probe was cancelled before a missing file was seen. The search
    /// space was not exhausted, so this says nothing about whether a
    /// corresponding file exists.
    Cancelled,
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found => write!(f, "found"),
            Self::NotFound => write!(f, "not found"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The immutable result of one probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    selected: PathBuf,
    found: Option<KnownFile>,
    outcome: ProbeOutcome,
    checked: usize,
}

impl ProbeResult {
    /// A probe that found `file` after checking `checked` entries.
    #[must_use]
    pub fn found(selected: PathBuf, file: KnownFile, checked: usize) -> Self {
        Self {
            selected,
            found: Some(file),
            outcome: ProbeOutcome::Found,
            checked,
        }
    }

    /// A probe that checked every entry without finding a missing one.
    #[must_use]
    pub fn not_found(selected: PathBuf, checked: usize) -> Self {
        Self {
            selected,
            found: None,
            outcome: ProbeOutcome::NotFound,
            checked,
        }
    }

    /// A probe cancelled after checking `checked` entries.
    #[must_use]
    pub fn cancelled(selected: PathBuf, checked: usize) -> Self {
        Self {
            selected,
            found: None,
            outcome: ProbeOutcome::Cancelled,
            checked,
        }
    }

    /// The file that was disabled.
    #[must_use]
    pub fn selected(&self) -> &Path {
        &self.selected
    }

    /// The corresponding file, if one was found.
    #[must_use]
    pub fn corresponding(&self) -> Option<&KnownFile> {
        self.found.as_ref()
    }

    /// How the probe ended.
    #[must_use]
    pub fn outcome(&self) -> ProbeOutcome {
        self.outcome
    }

    /// Whether a corresponding file was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.outcome == ProbeOutcome::Found
    }

    /// Number of known files checked against the live filesystem.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.checked
    }
}
