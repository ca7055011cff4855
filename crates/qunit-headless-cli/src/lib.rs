//! Command-line runner for QUnit suites in headless Chrome.
//!
//! The binary is a thin shell over these modules:
//!
//! - [`cli`] - argument definitions
//! - [`config`] - layered configuration (defaults, file, environment, flags)
//! - [`target`] - turning the target argument into a URL
//! - [`run`] - the run command itself
//! - [`ui`] - report rendering, status messages, spinner
//! - [`logger`] - tracing subscriber setup
//! - [`error`] - error types and miette rendering

pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod run;
pub mod target;
pub mod ui;

pub use error::{CliError, ConfigError, Result};
