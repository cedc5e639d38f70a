//! JSON output formatter.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Reveal Schema
//!
//! ```json
//! {
//!   "direction": "reveal_encrypted",
//!   "target_root": "/vaults/work",
//!   "results": [
//!     {
//!       "selected": "/mnt/work/report.pdf",
//!       "status": "found",
//!       "corresponding": "/vaults/work/d/AB/CDEF/x.c9r",
//!       "relative": "d/AB/CDEF/x.c9r",
//!       "checked": 12,
//!       "error": null
//!     }
//!   ],
//!   "summary": {
//!     "known_files": 240,
//!     "scan_duration_ms": 31,
//!     "found": 1,
//!     "not_found": 0,
//!     "failed": 0,
//!     "interrupted": false,
//!     "exit_code": 0,
//!     "exit_code_name": "VR000"
//!   }
//! }
//! ```
//!
//! # Scan Schema
//!
//! ```json
//! {
//!   "root": "/vaults/work",
//!   "files": [{ "path": "/vaults/work/d/AB/CDEF/x.c9r", "relative": "d/AB/CDEF/x.c9r" }],
//!   "summary": { "files": 1, "errors": 0, "scan_duration_ms": 2, "interrupted": false,
//!                "exit_code": 0, "exit_code_name": "VR000" }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::{ReportStatus, RevealReport};
use crate::error::ExitCode;
use crate::scanner::{KnownFile, ScanSummary};
use crate::session::Direction;

/// Summary of a reveal run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRevealSummary {
    /// Number of known files under the target root
    pub known_files: usize,
    /// Duration of the target scan in milliseconds
    pub scan_duration_ms: u64,
    /// Selected files whose counterpart was found
    pub found: usize,
    /// Selected files with no counterpart
    pub not_found: usize,
    /// Selected files whose probe failed
    pub failed: usize,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "VR000")
    pub exit_code_name: String,
}

/// Complete JSON output of a reveal run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRevealOutput {
    pub direction: Direction,
    pub target_root: String,
    pub results: Vec<RevealReport>,
    pub summary: JsonRevealSummary,
}

impl JsonRevealOutput {
    /// Build the output from the per-file reports.
    #[must_use]
    pub fn new(
        direction: Direction,
        target_root: &Path,
        reports: &[RevealReport],
        scan: &ScanSummary,
        exit_code: ExitCode,
    ) -> Self {
        let count = |status: ReportStatus| reports.iter().filter(|r| r.status == status).count();
        Self {
            direction,
            target_root: target_root.to_string_lossy().into_owned(),
            results: reports.to_vec(),
            summary: JsonRevealSummary {
                known_files: scan.files,
                scan_duration_ms: scan.duration.as_millis() as u64,
                found: count(ReportStatus::Found),
                not_found: count(ReportStatus::NotFound),
                failed: count(ReportStatus::Error),
                interrupted: exit_code == ExitCode::Interrupted,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// Summary of a scan run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonScanSummary {
    pub files: usize,
    pub errors: usize,
    pub scan_duration_ms: u64,
    pub interrupted: bool,
    pub exit_code: i32,
    pub exit_code_name: String,
}

/// Complete JSON output of a scan run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonScanOutput<'a> {
    pub root: String,
    pub files: &'a [KnownFile],
    pub summary: JsonScanSummary,
}

impl<'a> JsonScanOutput<'a> {
    #[must_use]
    pub fn new(root: &Path, files: &'a [KnownFile], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            root: root.to_string_lossy().into_owned(),
            files,
            summary: JsonScanSummary {
                files: summary.files,
                errors: summary.errors,
                scan_duration_ms: summary.duration.as_millis() as u64,
                interrupted: summary.interrupted,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
