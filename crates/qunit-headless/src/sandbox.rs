//! The capability boundary between the runner and the automation engine.
//!
//! A run only needs an isolated page that can expose host functions, run a
//! script before every document, navigate, and be released. [`Sandbox`] and
//! [`SandboxProvider`] describe exactly that, so the runner can be driven by
//! headless Chrome ([`ChromeProvider`]) or by an in-memory double in tests.

use crate::browser::{TestBrowser, TestBrowserConfig};
use crate::console::ConsoleMessage;
use crate::error::Result;
use crate::page::Page;
use crate::runner::RunOptions;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::{debug, warn};

/// One invocation of a host function from page script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingCall {
    /// Host function name.
    pub name: String,
    /// The JSON text the page passed.
    pub payload: String,
}

/// Host function invocations in the order the page made them.
pub type BindingStream = BoxStream<'static, BindingCall>;

/// An isolated page for one run.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Exposes one host function per name and returns their invocations.
    async fn expose_bindings(&self, names: &[String]) -> Result<BindingStream>;

    /// Registers a script evaluated in every new document before page
    /// scripts.
    async fn add_init_script(&self, source: &str) -> Result<()>;

    /// Loads `url`.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Error-level console messages captured so far.
    fn console_errors(&self) -> Vec<ConsoleMessage> {
        Vec::new()
    }

    /// Releases the page and everything behind it. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sandboxes.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Acquires a fresh sandbox for `options`.
    ///
    /// Anything acquired before a failure is released by the provider.
    async fn open(&self, options: &RunOptions) -> Result<Box<dyn Sandbox>>;
}

/// Launches one headless Chrome per run.
#[derive(Debug, Clone, Default)]
pub struct ChromeProvider {
    config: TestBrowserConfig,
}

impl ChromeProvider {
    /// Creates a provider with the given browser configuration.
    #[must_use]
    pub fn new(config: TestBrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxProvider for ChromeProvider {
    async fn open(&self, options: &RunOptions) -> Result<Box<dyn Sandbox>> {
        let browser = TestBrowser::launch(self.config.clone()).await?;

        match browser.new_page(options.redirect_console).await {
            Ok(page) => Ok(Box::new(ChromeSandbox {
                browser,
                page: Some(page),
            })),
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("failed to close browser after page error: {}", close_err);
                }
                Err(e)
            }
        }
    }
}

/// A Chrome tab together with the browser that owns it.
pub struct ChromeSandbox {
    browser: TestBrowser,
    page: Option<Page>,
}

impl ChromeSandbox {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or(crate::error::BrowserError::AlreadyClosed)
    }
}

#[async_trait]
impl Sandbox for ChromeSandbox {
    async fn expose_bindings(&self, names: &[String]) -> Result<BindingStream> {
        self.page()?.expose_bindings(names).await
    }

    async fn add_init_script(&self, source: &str) -> Result<()> {
        self.page()?.add_init_script(source).await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page()?.navigate(url).await
    }

    fn console_errors(&self) -> Vec<ConsoleMessage> {
        self.page
            .as_ref()
            .map(|page| page.console().errors())
            .unwrap_or_default()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("failed to close page: {}", e);
            }
        }
        debug!("releasing browser");
        self.browser.close().await
    }
}
