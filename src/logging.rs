//! Logging setup.
//!
//! The `log` facade with an `env_logger` backend, writing to stderr so the
//! revealed path on stdout stays pipeable. The level comes from, in order:
//!
//! 1. `RUST_LOG`, if set
//! 2. `--quiet` (errors only) or `--verbose` (debug, then trace)
//! 3. info
//!
//! Verbosity only raises this crate's own level; dependencies stay at
//! warn so `-vv` shows every probed path without walker noise.
//!
//! Debug builds prefix a timestamp (and the module path with `-v`);
//! release builds print level and message only.
//!
//! ```rust,no_run
//! use vault_revealer::logging::init_logging;
//!
//! init_logging(1, false, false);
//! log::debug!("probing");
//! ```

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use std::env;
use std::io::Write;

const CRATE_TARGET: &str = "vault_revealer";

/// Install the process-wide logger.
///
/// Only the first call in a process has an effect, so [`crate::run_app`]
/// can be invoked repeatedly (as the integration tests do).
///
/// * `verbose` - `-v` count: 0 info, 1 debug, 2+ trace
/// * `quiet` - errors only; wins over `verbose`, loses to `RUST_LOG`
/// * `no_color` - never emit ANSI styles
pub fn init_logging(verbose: u8, quiet: bool, no_color: bool) {
    let from_env = env::var("RUST_LOG").ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    match from_env {
        Some(ref filters) => {
            builder.parse_filters(filters);
        }
        None => {
            builder
                .filter_level(dependency_level(level))
                .filter_module(CRATE_TARGET, level);
        }
    }
    if no_color {
        builder.write_style(WriteStyle::Never);
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_ok() {
        match from_env {
            Some(filters) => log::debug!("Log filters from RUST_LOG: {}", filters),
            None => log::debug!("Log level: {}", level),
        }
    }
}

/// Level for this crate's own records.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Level for every other crate: never chattier than warn.
fn dependency_level(own: LevelFilter) -> LevelFilter {
    own.min(LevelFilter::Warn)
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    builder.format(move |buf, record| {
        let timestamp = buf.timestamp_seconds();
        let style = buf.default_level_style(record.level());
        write!(buf, "{} {style}{:<5}{style:#} ", timestamp, record.level())?;
        if verbose >= 1 {
            write!(buf, "[{}] ", record.module_path().unwrap_or("?"))?;
        }
        writeln!(buf, "{}", record.args())
    });

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
        });
    }
}
