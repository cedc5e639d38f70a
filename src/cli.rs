//! Command-line interface definitions for vault-revealer.
//!
//! Global options (verbosity, color, config file, error format) apply to
//! every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Find the encrypted file behind a decrypted one
//! vault-revealer reveal --target-root ~/Vaults/work ~/mnt/work/report.pdf
//!
//! # The other way round, several files at once, as JSON
//! vault-revealer reveal --direction decrypted --target-root ~/mnt/work \
//!     --output json ~/Vaults/work/d/AB/CDEF/x.c9r ~/Vaults/work/d/AB/CDEF/y.c9r
//!
//! # List what a probe would compare against
//! vault-revealer scan ~/Vaults/work
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::session::Direction;

/// Find the encrypted file behind a decrypted one, or vice versa.
///
/// The selected file is briefly renamed so the vault stops recognising it;
/// the file in the other tree that disappears as a result is its
/// counterpart. The selected file is always renamed back.
#[derive(Debug, Parser)]
#[command(name = "vault-revealer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors and results
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Plain ASCII progress output for screen readers
    #[arg(long, global = true)]
    pub accessible: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reveal the corresponding file for each selected file
    Reveal(RevealArgs),
    /// List the known files under a root
    Scan(ScanArgs),
}

/// Arguments for the reveal subcommand.
#[derive(Debug, Args)]
pub struct RevealArgs {
    /// Root of the tree to search for the corresponding file
    #[arg(long, value_name = "DIR")]
    pub target_root: PathBuf,

    /// Root the selected files come from (only used to warn about files
    /// outside it)
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Which kind of file to reveal
    #[arg(short, long, value_enum, default_value = "encrypted")]
    pub direction: DirectionArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Suffix used to disable a file (overrides the config file)
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Selected files, probed one after another
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root directory to list
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Output format (text prints a count, json prints every file)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Which side to reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// A decrypted file was selected; reveal the encrypted file
    Encrypted,
    /// An encrypted file was selected; reveal the decrypted file
    Decrypted,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Encrypted => Direction::RevealEncrypted,
            DirectionArg::Decrypted => Direction::RevealDecrypted,
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
