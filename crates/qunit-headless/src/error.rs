//! Error types for browser control and test runs.
//!
//! Two layers are kept apart: [`BrowserError`] covers the automation engine
//! (launching Chrome, exposing bindings, navigating), while [`RunError`]
//! covers a whole run, including the lifecycle protocol and the deadline.
//! A run never returns partial results, so every failure ends up as a
//! `RunError`.

use crate::bridge::Lifecycle;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the browser capability layer.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to launch the browser process.
    ///
    /// This typically occurs when Chrome/Chromium is not installed,
    /// or when there are permission issues with the executable.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// Human-readable reason for the launch failure
        reason: String,
        /// Optional underlying error that caused the failure
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to establish or use the Chrome DevTools Protocol connection.
    #[error("CDP connection failed: {0}")]
    ConnectionFailed(String),

    /// Navigation to a URL failed.
    #[error("navigation to '{url}' failed: {reason}")]
    NavigationFailed {
        /// The URL that failed to load
        url: String,
        /// Reason for the navigation failure
        reason: String,
    },

    /// Installing a host binding or a pre-navigation script failed.
    #[error("failed to install '{name}' in the page: {reason}")]
    InstallFailed {
        /// Binding or script name
        name: String,
        /// Reason reported by the browser
        reason: String,
    },

    /// An operation was attempted on a closed browser instance.
    #[error("browser instance is already closed")]
    AlreadyClosed,

    /// Wraps errors from the chromiumoxide library.
    #[error("chromiumoxide error: {0}")]
    ChromiumOxide(#[from] chromiumoxide::error::CdpError),

    /// Generic I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A lifecycle event referenced a record the tree does not contain.
///
/// This means the framework emitted events out of order, or the page runs a
/// framework whose event vocabulary does not match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// No module with this name was started.
    #[error("`{event}` referenced unknown module '{module}'")]
    UnknownModule {
        /// Event that performed the lookup
        event: Lifecycle,
        /// Module name carried by the event
        module: String,
    },

    /// The module exists but holds no matching test.
    #[error("`{event}` referenced unknown test '{test}' in module '{module}'")]
    UnknownTest {
        /// Event that performed the lookup
        event: Lifecycle,
        /// Module name carried by the event
        module: String,
        /// Test name carried by the event
        test: String,
    },
}

/// The reasons a run can fail.
#[derive(Debug, Error)]
pub enum RunError {
    /// The terminal event did not arrive before the deadline.
    #[error("test run could not finish in {}ms", timeout.as_millis())]
    Timeout {
        /// The configured deadline
        timeout: Duration,
    },

    /// A lifecycle event could not be folded into the result tree.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The page failed to load the target.
    #[error("navigation to '{url}' failed: {reason}")]
    Navigation {
        /// Target URL
        url: String,
        /// Reason reported by the browser
        reason: String,
    },

    /// A lifecycle payload did not have the expected shape.
    #[error("malformed `{event}` payload: {source}")]
    Payload {
        /// Event whose payload failed to parse
        event: Lifecycle,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The event channel closed before the terminal event arrived.
    #[error("page closed before the test run finished")]
    Disconnected,

    /// Any other browser-level failure.
    #[error(transparent)]
    Browser(BrowserError),
}

impl From<BrowserError> for RunError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::NavigationFailed { url, reason } => RunError::Navigation { url, reason },
            other => RunError::Browser(other),
        }
    }
}

impl RunError {
    /// Returns true if the run failed because of the deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::Timeout { .. })
    }
}

/// A specialized Result type for browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_failure_maps_to_run_navigation() {
        let err: RunError = BrowserError::NavigationFailed {
            url: "file:///missing.html".into(),
            reason: "net::ERR_FILE_NOT_FOUND".into(),
        }
        .into();

        assert!(matches!(err, RunError::Navigation { ref url, .. } if url == "file:///missing.html"));
    }

    #[test]
    fn other_browser_failures_stay_wrapped() {
        let err: RunError = BrowserError::AlreadyClosed.into();
        assert!(matches!(err, RunError::Browser(BrowserError::AlreadyClosed)));
    }

    #[test]
    fn timeout_message_names_the_deadline() {
        let err = RunError::Timeout {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "test run could not finish in 1500ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn protocol_error_message() {
        let err = ProtocolError::UnknownTest {
            event: Lifecycle::TestDone,
            module: "M".into(),
            test: "A".into(),
        };
        assert_eq!(
            err.to_string(),
            "`testDone` referenced unknown test 'A' in module 'M'"
        );
    }
}
