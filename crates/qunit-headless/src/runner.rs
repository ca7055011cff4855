//! The run orchestrator.
//!
//! [`Runner::run`] acquires a sandbox, installs the host functions and the
//! bridge shim, navigates, and folds lifecycle events into an
//! [`Aggregator`] until `done` arrives. The deadline covers navigation and
//! event collection; whichever of `done`, a failure, or the deadline comes
//! first decides the outcome. The sandbox is released on every path.

use crate::aggregator::{Aggregator, Progress};
use crate::bridge::{BridgeScript, CallbackNames, DEFAULT_BINDING_PREFIX};
use crate::browser::TestBrowserConfig;
use crate::error::RunError;
use crate::events::LifecycleEvent;
use crate::report::Report;
use crate::sandbox::{BindingStream, ChromeProvider, Sandbox, SandboxProvider};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Default deadline for a run (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What to run and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Absolute URL of the test document. No normalization happens here.
    pub url: String,

    /// Deadline for the whole run; also handed to the framework as its
    /// per-test timeout.
    #[serde(rename = "timeoutMs", with = "millis")]
    pub timeout: Duration,

    /// Re-emit page console output through `tracing`.
    pub redirect_console: bool,
}

impl RunOptions {
    /// Options for `url` with the default deadline and no console
    /// redirection.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            redirect_console: false,
        }
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables console redirection.
    #[must_use]
    pub fn with_redirect_console(mut self, redirect: bool) -> Self {
        self.redirect_console = redirect;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Drives test documents through a [`SandboxProvider`].
#[derive(Debug, Clone)]
pub struct Runner<P> {
    provider: P,
    callbacks: CallbackNames,
}

impl Runner<ChromeProvider> {
    /// A runner backed by headless Chrome.
    #[must_use]
    pub fn chrome(config: TestBrowserConfig) -> Self {
        Self::new(ChromeProvider::new(config))
    }
}

impl<P: SandboxProvider> Runner<P> {
    /// A runner backed by `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            callbacks: CallbackNames::with_prefix(DEFAULT_BINDING_PREFIX),
        }
    }

    /// Uses a different prefix for host function names.
    #[must_use]
    pub fn with_binding_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.callbacks = CallbackNames::with_prefix(prefix);
        self
    }

    /// Runs the suite at `options.url` and returns its report.
    ///
    /// # Errors
    ///
    /// - [`RunError::Timeout`] when `done` does not arrive in time
    /// - [`RunError::Protocol`] / [`RunError::Payload`] when an event cannot
    ///   be folded into the tree
    /// - [`RunError::Navigation`] when the page fails to load
    /// - [`RunError::Disconnected`] when the page goes away first
    /// - [`RunError::Browser`] for any other automation failure
    pub async fn run(&self, options: &RunOptions) -> Result<Report, RunError> {
        info!(url = %options.url, timeout_ms = options.timeout.as_millis(), "starting test run");

        let mut sandbox = self.provider.open(options).await?;
        let outcome = self.drive(sandbox.as_ref(), options).await;

        if let Err(RunError::Timeout { .. }) = &outcome {
            for message in sandbox.console_errors() {
                warn!(source = ?message.source, "page console error: {}", message.text);
            }
        }

        if let Err(e) = sandbox.close().await {
            warn!("failed to release sandbox: {}", e);
        }

        match &outcome {
            Ok(report) => debug!(failed = report.stats.failed, "test run finished"),
            Err(e) => debug!("test run failed: {}", e),
        }
        outcome
    }

    async fn drive(&self, sandbox: &dyn Sandbox, options: &RunOptions) -> Result<Report, RunError> {
        let mut calls = sandbox.expose_bindings(&self.callbacks.names()).await?;

        let shim = BridgeScript::new(options.timeout, self.callbacks.clone())
            .render()
            .map_err(|e| {
                RunError::Browser(crate::error::BrowserError::InstallFailed {
                    name: "bridge shim".to_string(),
                    reason: e.to_string(),
                })
            })?;
        sandbox.add_init_script(&shim).await?;

        let run = async {
            sandbox.navigate(&options.url).await?;
            debug!(url = %options.url, "navigation committed");
            self.collect(&mut calls).await
        };

        match tokio::time::timeout(options.timeout, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RunError::Timeout {
                timeout: options.timeout,
            }),
        }
    }

    /// Single owner of the result tree: applies invocations strictly in
    /// arrival order until `done`.
    async fn collect(&self, calls: &mut BindingStream) -> Result<Report, RunError> {
        let mut aggregator = Aggregator::new();

        while let Some(call) = calls.next().await {
            let Some(kind) = self.callbacks.lifecycle_for(&call.name) else {
                trace!(binding = %call.name, "ignoring unrelated binding call");
                continue;
            };

            let event = LifecycleEvent::parse(kind, &call.payload)?;
            if let Progress::Complete(report) = aggregator.apply(event)? {
                return Ok(report);
            }
        }

        Err(RunError::Disconnected)
    }
}
