//! Plain text output.
//!
//! A single selected file prints just the revealed path, so the output can
//! be fed straight to another command. Several selected files print one
//! `selected -> revealed` line each.

use std::io::{self, Write};
use std::path::Path;

use super::{ReportStatus, RevealReport};
use crate::scanner::ScanSummary;
use crate::session::Direction;

/// Text renderer for reveal and scan results.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput {
    direction: Direction,
}

impl TextOutput {
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    /// Write one line per report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_reports<W: Write>(&self, writer: &mut W, reports: &[RevealReport]) -> io::Result<()> {
        let bare = reports.len() == 1;
        let label = self.direction.revealed_label();

        for report in reports {
            match (report.status, report.corresponding.as_deref()) {
                (ReportStatus::Found, Some(path)) if bare => writeln!(writer, "{}", path)?,
                (ReportStatus::Found, Some(path)) => {
                    writeln!(writer, "{} -> {}", report.selected, path)?;
                }
                (ReportStatus::Found | ReportStatus::NotFound, _) => writeln!(
                    writer,
                    "{}: no corresponding {} file found ({} checked)",
                    report.selected, label, report.checked
                )?,
                (ReportStatus::Cancelled, _) => {
                    writeln!(writer, "{}: search interrupted", report.selected)?;
                }
                (ReportStatus::Error, _) => writeln!(
                    writer,
                    "{}: error: {}",
                    report.selected,
                    report.error.as_deref().unwrap_or("unknown error")
                )?,
            }
        }
        Ok(())
    }

    /// Write the result of a scan.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_scan<W: Write>(writer: &mut W, root: &Path, summary: &ScanSummary) -> io::Result<()> {
        if summary.interrupted {
            writeln!(writer, "Scan of {} interrupted after {} files", root.display(), summary.files)?;
            return Ok(());
        }
        writeln!(
            writer,
            "{} known files under {} ({} unreadable entries, {:.2?})",
            summary.files,
            root.display(),
            summary.errors,
            summary.duration
        )
    }
}
