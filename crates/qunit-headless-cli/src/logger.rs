//! Logging setup for the CLI.
//!
//! Library events (run lifecycle, redirected page console output under the
//! `qunit_headless::page` target) flow through `tracing`; this module installs
//! the subscriber that prints them.
//!
//! # Example
//!
//! ```rust,no_run
//! use qunit_headless_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("starting run");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "qunit_headless=debug,qunit_headless_cli=debug";
const QUIET_FILTER: &str = "qunit_headless=error,qunit_headless_cli=error";
const DEFAULT_FILTER: &str = "qunit_headless=info,qunit_headless_cli=info";

/// Initialize the tracing subscriber.
///
/// The filter is chosen in this order:
/// 1. `--verbose`: debug for this project's crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`
/// 4. info for this project's crates
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the tracing subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
