//! Page-level browser operations.
//!
//! [`Page`] wraps a chromiumoxide tab with the three capabilities a run
//! needs: host functions callable from page script, scripts evaluated before
//! every document, and navigation. Console output is captured from the
//! moment the page exists.

use crate::console::{parse_console_event, ConsoleCapture};
use crate::error::{BrowserError, Result};
use crate::sandbox::{BindingCall, BindingStream};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::{
    AddBindingParams, EventBindingCalled, EventConsoleApiCalled,
};
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A browser tab with console capture.
#[derive(Debug)]
pub struct Page {
    inner: Arc<ChromePage>,
    console: ConsoleCapture,
    console_task: JoinHandle<()>,
}

impl Page {
    /// Wraps a tab and starts console capture.
    ///
    /// When `redirect_console` is set every message is also re-emitted
    /// through `tracing`.
    pub(crate) fn new(page: ChromePage, redirect_console: bool) -> Self {
        let console = ConsoleCapture::new();
        let sink = console.clone();
        let page = Arc::new(page);

        let listener = page.clone();
        let console_task = tokio::spawn(async move {
            match listener.event_listener::<EventConsoleApiCalled>().await {
                Ok(mut events) => {
                    while let Some(event) = events.next().await {
                        let message = parse_console_event(&event);
                        if redirect_console {
                            message.redirect();
                        }
                        sink.push(message);
                    }
                }
                Err(e) => warn!("console capture unavailable: {}", e),
            }
        });

        Self {
            inner: page,
            console,
            console_task,
        }
    }

    /// Returns a handle to the console message capture.
    #[must_use]
    pub fn console(&self) -> &ConsoleCapture {
        &self.console
    }

    /// Exposes one host function per name and returns the stream of their
    /// invocations.
    ///
    /// Page script calls `window[name](text)`; each call arrives as a
    /// [`BindingCall`] in the order the page made them.
    ///
    /// # Errors
    ///
    /// Returns `InstallFailed` if the browser rejects a binding.
    pub async fn expose_bindings(&self, names: &[String]) -> Result<BindingStream> {
        // Subscribe first so no invocation can slip past the listener.
        let events = self
            .inner
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        for name in names {
            self.inner
                .execute(AddBindingParams::new(name.clone()))
                .await
                .map_err(|e| BrowserError::InstallFailed {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            debug!(binding = %name, "exposed host function");
        }

        Ok(events
            .map(|event| BindingCall {
                name: event.name.clone(),
                payload: event.payload.clone(),
            })
            .boxed())
    }

    /// Registers a script that runs in every new document before the
    /// document's own scripts.
    ///
    /// # Errors
    ///
    /// Returns `InstallFailed` if the browser rejects the script.
    pub async fn add_init_script(&self, source: &str) -> Result<()> {
        self.inner
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source.to_string()))
            .await
            .map_err(|e| BrowserError::InstallFailed {
                name: "init script".to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Navigates to an absolute URL and waits for the navigation to commit.
    ///
    /// # Errors
    ///
    /// Returns `NavigationFailed` if the page fails to load.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Evaluates an expression in the page and deserializes the result.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails or the value does not deserialize.
    pub async fn evaluate<T>(&self, script: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let result = self
            .inner
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))
    }

    /// Closes the tab.
    ///
    /// The console listener holds a second reference to the tab; it is
    /// aborted first. If the tab is still shared afterwards, closing is left
    /// to the browser shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if closing the page fails.
    pub async fn close(self) -> Result<()> {
        self.console_task.abort();
        // Wait for the aborted task to drop its Arc.
        let _ = self.console_task.await;

        match Arc::try_unwrap(self.inner) {
            Ok(page) => {
                page.close().await.map_err(BrowserError::ChromiumOxide)?;
                Ok(())
            }
            Err(_shared) => {
                warn!("page still referenced at close; leaving it to browser shutdown");
                Ok(())
            }
        }
    }
}
