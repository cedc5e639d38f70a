//! Output formatters for reveal and scan results.
//!
//! This module renders results for the two output formats:
//! - Text for people, one line per selected file
//! - JSON for automation and scripting
//!
//! Progress and logs go to stderr; everything here is written to the
//! writer the caller passes (normally stdout).

pub mod json;
pub mod text;

use serde::Serialize;

use crate::correspondence::{ProbeError, ProbeOutcome, ProbeResult};

pub use json::{JsonOutputError, JsonRevealOutput, JsonScanOutput};
pub use text::TextOutput;

/// How the reveal of one selected file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Found,
    NotFound,
    Cancelled,
    Error,
}

impl From<ProbeOutcome> for ReportStatus {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Found => Self::Found,
            ProbeOutcome::NotFound => Self::NotFound,
            ProbeOutcome::Cancelled => Self::Cancelled,
        }
    }
}

/// The result for one selected file, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct RevealReport {
    /// The selected file
    pub selected: String,
    pub status: ReportStatus,
    /// Absolute path of the corresponding file
    pub corresponding: Option<String>,
    /// The corresponding file relative to the target root
    pub relative: Option<String>,
    /// Number of known files checked
    pub checked: usize,
    /// Error message when the probe failed
    pub error: Option<String>,
}

impl RevealReport {
    /// Report for a probe that ran to an outcome.
    #[must_use]
    pub fn from_result(result: &ProbeResult) -> Self {
        let found = result.corresponding();
        Self {
            selected: result.selected().to_string_lossy().into_owned(),
            status: result.outcome().into(),
            corresponding: found.map(|f| f.path().to_string_lossy().into_owned()),
            relative: found.map(|f| f.relative().to_string_lossy().into_owned()),
            checked: result.checked(),
            error: None,
        }
    }

    /// Report for a probe that failed.
    #[must_use]
    pub fn from_error(selected: &std::path::Path, err: &ProbeError) -> Self {
        Self {
            selected: selected.to_string_lossy().into_owned(),
            status: ReportStatus::Error,
            corresponding: None,
            relative: None,
            checked: 0,
            error: Some(err.to_string()),
        }
    }
}
