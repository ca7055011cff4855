//! Error handling for the CLI.
//!
//! `CliError` gathers every failure a command can hit; `main` renders it
//! through miette and exits with status 1.

use qunit_headless::RunError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The target could not be turned into a URL
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget {
        /// What the user passed
        target: String,
        /// Why it was rejected
        reason: String,
    },

    /// The test run failed before producing a report
    #[error("Test run failed: {0}")]
    Run(#[from] RunError),

    /// Writing the JSON report failed
    #[error("Failed to write report to {}: {source}", path.display())]
    WriteReport {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file not found: {}\n\nHint: Check the --config path", .0.display())]
    NotFound(PathBuf),

    /// A source had the wrong shape or types
    #[error("{0}\n\nHint: Check qunit-headless.json and QUNIT_HEADLESS_* variables")]
    Invalid(String),
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Converts a `CliError` into a miette report with a hint where one helps.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Run(RunError::Timeout { timeout }) => miette::miette!(
            help = "Check that the page loads QUnit, or raise the timeout argument",
            "Test run could not finish in {}ms",
            timeout.as_millis()
        ),
        CliError::Run(RunError::Browser(e)) => miette::miette!(
            help = "Make sure Chrome or Chromium is installed, or pass --chrome-path",
            "Browser error: {}",
            e
        ),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_report_mentions_deadline() {
        let report = cli_error_to_miette(CliError::Run(RunError::Timeout {
            timeout: Duration::from_millis(750),
        }));
        assert_eq!(report.to_string(), "Test run could not finish in 750ms");
    }

    #[test]
    fn invalid_target_message() {
        let err = CliError::InvalidTarget {
            target: String::new(),
            reason: "target is empty".into(),
        };
        assert_eq!(err.to_string(), "Invalid target '': target is empty");
    }

    #[test]
    fn config_error_converts() {
        let err: CliError = ConfigError::NotFound(PathBuf::from("missing.json")).into();
        assert!(err.to_string().contains("missing.json"));
    }
}
