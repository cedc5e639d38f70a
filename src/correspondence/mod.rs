//! Correspondence detection between an encrypted and a decrypted tree.
//!
//! The flow is:
//! 1. Scan the other tree into a [`crate::scanner::FileSetCache`]
//! 2. Disable the selected file
//! 3. Re-check the cached listing against the live filesystem
//! 4. Restore the selected file and report the first missing entry

pub mod finder;
pub mod outcome;

pub use finder::{CorrespondenceFinder, FsProbe, PathProbe, ProbeError};
pub use outcome::{ProbeOutcome, ProbeResult};

/// Progress phase name used by probes.
pub const PROBE_PHASE: &str = "probe";
