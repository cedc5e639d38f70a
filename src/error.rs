//! Structured error handling and exit codes.

use serde::Serialize;

use crate::actions::disable::DisableError;
use crate::correspondence::ProbeError;
use crate::scanner::ScanError;
use crate::task::TaskError;

/// Exit codes for the vault-revealer application.
///
/// - 0: Success (every selected file was resolved)
/// - 1: General error (unexpected failure, I/O, configuration)
/// - 2: Not found (at least one selected file has no corresponding file)
/// - 3: Selection error (selected file missing, or its sidecar name taken)
/// - 4: Restore failure (a file is still disabled and must be renamed back)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ExitCode {
    /// Success: every selected file was resolved.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Not found: no known file disappeared for at least one selected file.
    NotFound = 2,
    /// Selection error: the selected file could not be disabled.
    SelectionError = 3,
    /// Restore failure: manual recovery required.
    RestoreFailure = 4,
    /// Interrupted: the run was cancelled by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "VR000",
            Self::GeneralError => "VR001",
            Self::NotFound => "VR002",
            Self::SelectionError => "VR003",
            Self::RestoreFailure => "VR004",
            Self::Interrupted => "VR130",
        }
    }

    /// Combine the outcomes of several files into one exit code.
    ///
    /// Restore failures dominate, then interruption, then selection errors,
    /// then general errors, then not-found.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.severity().max(other.severity()).1
    }

    fn severity(self) -> (u8, Self) {
        let rank = match self {
            Self::Success => 0,
            Self::NotFound => 1,
            Self::GeneralError => 2,
            Self::SelectionError => 3,
            Self::Interrupted => 4,
            Self::RestoreFailure => 5,
        };
        (rank, self)
    }
}

/// Classification of an application error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A root or selected file does not exist.
    NotFound,
    /// The sidecar name of the selected file is already taken.
    Conflict,
    /// A disabled file could not be renamed back.
    RestoreFailure,
    /// Anything else.
    Other,
}

impl ErrorCategory {
    /// Classify an error by looking for a known library error in its chain.
    #[must_use]
    pub fn of(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<ProbeError>() {
                return match e {
                    ProbeError::RestoreFailure { .. } => Self::RestoreFailure,
                    ProbeError::Disable(inner) => Self::of_disable(inner),
                    ProbeError::CacheNotReady(_) | ProbeError::Check { .. } => Self::Other,
                };
            }
            if let Some(e) = cause.downcast_ref::<DisableError>() {
                return Self::of_disable(e);
            }
            if let Some(e) = cause.downcast_ref::<ScanError>() {
                return match e {
                    ScanError::RootNotFound(_) => Self::NotFound,
                    _ => Self::Other,
                };
            }
            if cause.downcast_ref::<TaskError>().is_some() {
                return Self::Other;
            }
        }
        Self::Other
    }

    fn of_disable(err: &DisableError) -> Self {
        match err {
            DisableError::NotFound(_) => Self::NotFound,
            DisableError::Conflict { .. } => Self::Conflict,
            DisableError::RestoreFailed { .. } => Self::RestoreFailure,
            DisableError::Io { .. } => Self::Other,
        }
    }

    /// Exit code for a run that failed with this category of error.
    ///
    /// A missing *root* is a general error; a missing *selected file* is a
    /// selection error. Callers that know which one occurred should prefer
    /// [`ExitCode::SelectionError`] for the latter.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Conflict => ExitCode::SelectionError,
            Self::RestoreFailure => ExitCode::RestoreFailure,
            Self::NotFound | Self::Other => ExitCode::GeneralError,
        }
    }
}

/// Exit code for a failed probe of one selected file.
#[must_use]
pub fn probe_exit_code(err: &ProbeError) -> ExitCode {
    match err {
        ProbeError::RestoreFailure { .. } => ExitCode::RestoreFailure,
        ProbeError::Disable(DisableError::NotFound(_) | DisableError::Conflict { .. }) => {
            ExitCode::SelectionError
        }
        _ => ExitCode::GeneralError,
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "VR001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
