//! vault-revealer - find the file behind a file in an encrypted vault
//!
//! An encrypted vault (e.g. Cryptomator) and its unlocked mount share no
//! naming scheme, so there is no way to tell from the outside which
//! encrypted file holds which decrypted one. This crate finds out by
//! briefly renaming the selected file so the vault stops recognising it,
//! and checking which known file in the other tree disappears. The
//! selected file is always renamed back.
//!
//! The library is split into:
//! - [`scanner`]: listing the known files under a root
//! - [`actions`]: disabling and restoring one file
//! - [`correspondence`]: the probe itself
//! - [`task`]: running scans and probes on a background thread
//! - [`session`]: the two roots and the reveal direction

pub mod actions;
pub mod cli;
pub mod config;
pub mod correspondence;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod signal;
pub mod task;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, OutputFormat, RevealArgs, ScanArgs};
use crate::config::Config;
use crate::correspondence::ProbeOutcome;
use crate::error::{probe_exit_code, ExitCode};
use crate::output::{JsonRevealOutput, JsonScanOutput, RevealReport, TextOutput};
use crate::progress::Progress;
use crate::scanner::{FileSetCache, ScanSummary};
use crate::session::{Direction, RevealSession};
use crate::signal::ShutdownHandler;
use crate::task::{BackgroundTask, ProbeSettings, ProbeTask, ScanTask, TaskState};

/// Run the application with parsed arguments.
///
/// # Errors
///
/// Returns an error for failures that stop the whole run (configuration,
/// unreadable target root, a crashed worker). Per-file probe failures are
/// reported in the output and reflected in the returned exit code instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.no_color);

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let handler = signal::install_handler()?;

    match cli.command {
        Commands::Reveal(args) => {
            config.merge_cli(args.suffix.as_deref(), cli.accessible);
            config.validate()?;
            let progress = Progress::with_accessible(cli.quiet, config.accessible);
            run_reveal(args, &config, &progress, &handler)
        }
        Commands::Scan(args) => {
            config.merge_cli(None, cli.accessible);
            let progress = Progress::with_accessible(cli.quiet, config.accessible);
            run_scan(args, &config, &progress, &handler)
        }
    }
}

/// Start `task` and poll it until it reaches a terminal state.
///
/// Ctrl+C is forwarded as a cancel request; the task is then waited for so
/// any disabled file is restored before returning.
fn drive<T: Send + 'static>(
    task: &mut BackgroundTask<T>,
    progress: &Progress,
    interval: Duration,
    shutdown: &ShutdownHandler,
) -> TaskState {
    task.start();
    loop {
        let state = task.poll_with(progress);
        if state.is_terminal() {
            return state;
        }
        if shutdown.is_shutdown_requested() {
            log::info!("Cancelling background task");
            task.cancel();
            return task.wait_with(progress);
        }
        thread::sleep(interval);
    }
}

/// Scan `cache` on a background thread. Returns the cache and the summary,
/// or `None` with the cache if the scan was cancelled.
fn scan_in_background(
    cache: FileSetCache,
    config: &Config,
    progress: &Progress,
    shutdown: &ShutdownHandler,
) -> Result<(FileSetCache, Option<ScanSummary>)> {
    let root = cache.root().to_path_buf();
    let mut task = ScanTask::new(cache);
    let state = drive(&mut task, progress, config.poll_interval(), shutdown);

    let output = task
        .take_output()
        .context("scan task produced no output")??;
    let summary = output
        .result
        .with_context(|| format!("failed to scan {}", root.display()))?;

    Ok((output.cache, (state != TaskState::Cancelled).then_some(summary)))
}

fn run_scan(
    args: ScanArgs,
    config: &Config,
    progress: &Progress,
    shutdown: &ShutdownHandler,
) -> Result<ExitCode> {
    let (cache, summary) = scan_in_background(
        FileSetCache::new(&args.path),
        config,
        progress,
        shutdown,
    )?;

    let (summary, code) = match summary {
        Some(summary) => (summary, ExitCode::Success),
        None => (
            ScanSummary {
                interrupted: true,
                ..ScanSummary::default()
            },
            ExitCode::Interrupted,
        ),
    };

    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Text => TextOutput::write_scan(&mut stdout, &args.path, &summary)?,
        OutputFormat::Json => {
            let files = cache.entries().unwrap_or_default();
            JsonScanOutput::new(&args.path, files, &summary, code).write_to(&mut stdout, true)?;
        }
    }

    Ok(code)
}

fn run_reveal(
    args: RevealArgs,
    config: &Config,
    progress: &Progress,
    shutdown: &ShutdownHandler,
) -> Result<ExitCode> {
    let direction = Direction::from(args.direction);
    let mut session = RevealSession::new(direction);
    match direction {
        Direction::RevealEncrypted => {
            session.set_locked_root(&args.target_root);
            if let Some(ref source) = args.source_root {
                session.set_unlocked_root(source);
            }
        }
        Direction::RevealDecrypted => {
            session.set_unlocked_root(&args.target_root);
            if let Some(ref source) = args.source_root {
                session.set_locked_root(source);
            }
        }
    }

    log::info!(
        "Revealing {} files ({}) under {}",
        args.files.len(),
        direction,
        args.target_root.display()
    );

    let cache = session
        .take_target_cache()
        .context("target root is not configured")?;
    let (cache, scan) = scan_in_background(cache, config, progress, shutdown)?;
    session.put_target_cache(cache);

    let mut reports = Vec::with_capacity(args.files.len());
    let code = match scan {
        None => ExitCode::Interrupted,
        Some(ref scan) => {
            if scan.files == 0 {
                log::warn!(
                    "No files under {}; nothing can be revealed",
                    args.target_root.display()
                );
            }
            probe_each(&mut session, &args.files, config, progress, shutdown, &mut reports)?
        }
    };

    let scan = scan.unwrap_or_default();
    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(direction).write_reports(&mut stdout, &reports)?,
        OutputFormat::Json => JsonRevealOutput::new(
            direction,
            &args.target_root,
            &reports,
            &scan,
            code,
        )
        .write_to(&mut stdout, true)?,
    }

    Ok(code)
}

/// Probe every selected file in turn against the session's target listing.
fn probe_each(
    session: &mut RevealSession,
    files: &[PathBuf],
    config: &Config,
    progress: &Progress,
    shutdown: &ShutdownHandler,
    reports: &mut Vec<RevealReport>,
) -> Result<ExitCode> {
    let mut code = ExitCode::Success;
    let settings = ProbeSettings {
        suffix: config.sidecar_suffix.clone(),
    };

    for selected in files {
        if shutdown.is_shutdown_requested() {
            return Ok(code.worst(ExitCode::Interrupted));
        }

        if !session.is_in_source(selected) {
            log::warn!(
                "{} is not under the {} root; it is unlikely to have a counterpart",
                selected.display(),
                session.direction().selected_label()
            );
        }

        let cache = session
            .take_target_cache()
            .context("target listing is unavailable")?;
        let mut task = ProbeTask::new(selected.clone(), cache, settings.clone());
        drive(&mut task, progress, config.poll_interval(), shutdown);

        let output = match task.take_output().context("probe task produced no output")? {
            Ok(output) => output,
            Err(e) => {
                session.reset_target_cache();
                return Err(e).with_context(|| format!("probe of {} crashed", selected.display()));
            }
        };
        session.put_target_cache(output.cache);

        match output.result {
            Ok(result) => {
                let file_code = match result.outcome() {
                    ProbeOutcome::Found => ExitCode::Success,
                    ProbeOutcome::NotFound => ExitCode::NotFound,
                    ProbeOutcome::Cancelled => ExitCode::Interrupted,
                };
                code = code.worst(file_code);
                reports.push(RevealReport::from_result(&result));
                if file_code == ExitCode::Interrupted {
                    break;
                }
            }
            Err(e) => {
                let file_code = probe_exit_code(&e);
                code = code.worst(file_code);
                reports.push(RevealReport::from_error(selected, &e));
                if e.is_restore_failure() {
                    let sidecar = e
                        .stranded_sidecar()
                        .map_or_else(|| selected.display().to_string(), |p| p.display().to_string());
                    log::error!(
                        "{} could not be restored. Rename {} back to {} by hand.",
                        selected.display(),
                        sidecar,
                        selected.display()
                    );
                    break;
                }
                log::error!("{}", e);
            }
        }
    }

    Ok(code)
}
