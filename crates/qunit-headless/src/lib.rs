//! # qunit-headless
//!
//! Runs a QUnit suite inside headless Chrome and returns a structured,
//! serializable [`Report`] of its outcome.
//!
//! ## Architecture
//!
//! - **bridge**: the shim installed before page scripts; it intercepts the
//!   global `QUnit` assignment and forwards the seven lifecycle hooks to host
//!   functions as JSON text
//! - **sandbox**: the capability boundary (expose host functions, add a
//!   pre-navigation script, navigate, release), implemented for Chrome by
//!   [`ChromeProvider`]
//! - **aggregator**: folds lifecycle events into the result tree
//! - **runner**: owns the page lifecycle and the completion/deadline race
//! - **browser**, **page**, **console**: chromiumoxide plumbing
//!
//! Host function invocations are consumed by a single task, so the result
//! tree has exactly one writer and needs no locking.
//!
//! ## Example Usage
//!
//! ```ignore
//! use qunit_headless::{RunOptions, Runner, TestBrowserConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Runner::chrome(TestBrowserConfig::default());
//!     let options = RunOptions::new("file:///project/test/index.html")
//!         .with_timeout(Duration::from_secs(10));
//!
//!     let report = runner.run(&options).await?;
//!     println!("{} of {} assertions failed", report.stats.failed, report.stats.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Testing Strategy
//!
//! 1. **Unit tests**: merge rules, payload parsing, shim rendering
//! 2. **Runner tests**: the orchestrator against a scripted sandbox
//! 3. **Integration tests**: real browser tests (require Chrome installed)
//!
//! Run with `cargo test` (unit) or `cargo test -- --ignored` (integration).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod bridge;
pub mod browser;
pub mod console;
pub mod error;
#[allow(missing_docs)]
pub mod events;
pub mod page;
#[allow(missing_docs)]
pub mod report;
pub mod runner;
pub mod sandbox;

// Re-export main types for convenience
pub use aggregator::{Aggregator, Progress};
pub use bridge::{
    BridgeScript, CallbackNames, Lifecycle, DEFAULT_BINDING_PREFIX, FRAMEWORK_GLOBAL,
    UNENCODABLE_PREFIX,
};
pub use browser::{TestBrowser, TestBrowserConfig};
pub use console::{ConsoleCapture, ConsoleLevel, ConsoleMessage};
pub use error::{BrowserError, ProtocolError, Result, RunError};
pub use events::LifecycleEvent;
pub use page::Page;
pub use report::{LogEntry, Module, Report, RunStats, Test};
pub use runner::{RunOptions, Runner, DEFAULT_TIMEOUT};
pub use sandbox::{BindingCall, BindingStream, ChromeProvider, ChromeSandbox, Sandbox, SandboxProvider};
