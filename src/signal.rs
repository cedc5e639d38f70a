//! Ctrl+C handling.
//!
//! Ctrl+C never kills a probe outright. The handler only records the
//! interrupt; the polling loop in [`crate::run_app`] sees it, cancels the
//! running task and waits for it, so a disabled file is renamed back
//! before the process exits. Pressing Ctrl+C again does not skip that.
//!
//! ```rust,no_run
//! use vault_revealer::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! if handler.is_shutdown_requested() {
//!     // cancel the running task and wait for it
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Counts interrupts received since the last [`reset`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    presses: Arc<AtomicUsize>,
}

impl ShutdownHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one interrupt has arrived.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.presses() > 0
    }

    /// Number of interrupts received.
    #[must_use]
    pub fn presses(&self) -> usize {
        self.presses.load(Ordering::SeqCst)
    }

    /// Record an interrupt as if Ctrl+C had been pressed. Returns the new count.
    pub fn request_shutdown(&self) -> usize {
        self.presses.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset(&self) {
        self.presses.store(0, Ordering::SeqCst);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

fn announce(presses: usize) {
    let mut stderr = std::io::stderr();
    let _ = if presses == 1 {
        writeln!(stderr, "\nInterrupted. Restoring any disabled file...")
    } else {
        writeln!(
            stderr,
            "\nStill restoring; the process exits once the file is back in place."
        )
    };
    let _ = stderr.flush();
}

/// Warning shown when no Ctrl+C hook could be installed.
fn unhooked_warning(err: &dyn std::fmt::Display) -> String {
    format!(
        "Could not install the Ctrl+C handler ({}). Ctrl+C will end the process \
         without restoring a file that is being probed.",
        err
    )
}

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// Later calls reset and return the installed handler. If the OS hook is
/// already owned by someone else, an unhooked handler is returned that
/// still honours [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Currently always succeeds.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let hooked = handler.clone();
    let installed = ctrlc::set_handler(move || {
        let presses = hooked.request_shutdown();
        announce(presses);
        log::info!("Interrupt received ({})", presses);
    });

    if let Err(e) = installed {
        if let Some(existing) = GLOBAL_HANDLER.get() {
            existing.reset();
            return Ok(existing.clone());
        }
        log::warn!("{}", unhooked_warning(&e));
    }
    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
