//! Runner configuration with multi-source loading.
//!
//! Priority: CLI args > environment (`QUNIT_HEADLESS_*`) > config file >
//! defaults. The config file is `--config <path>`, or `qunit-headless.json`
//! in the working directory when it exists.

use crate::cli::Cli;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use qunit_headless::{RunOptions, TestBrowserConfig, DEFAULT_BINDING_PREFIX, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "qunit-headless.json";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "QUNIT_HEADLESS_";

/// Settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Run deadline in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Re-emit page console output
    #[serde(default)]
    pub redirect_console: bool,

    /// Run Chrome without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chrome executable override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Prefix for host function names
    #[serde(default = "default_binding_prefix")]
    pub binding_prefix: String,
}

fn default_timeout() -> u64 {
    u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(30_000)
}

fn default_headless() -> bool {
    true
}

fn default_binding_prefix() -> String {
    DEFAULT_BINDING_PREFIX.to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            redirect_console: false,
            headless: default_headless(),
            chrome_path: None,
            binding_prefix: default_binding_prefix(),
        }
    }
}

/// Only the values the user actually passed on the command line.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_console: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chrome_path: Option<String>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            timeout: cli.timeout,
            redirect_console: cli.redirect_console.then_some(true),
            headless: cli.visible.then_some(false),
            chrome_path: cli.chrome_path.clone(),
        }
    }
}

/// `QUNIT_HEADLESS_*` variables, keyed like the config file.
///
/// figment lowercases environment keys (`redirect_console`); the file and
/// the other layers use camelCase, so the keys are renamed to match.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| match key.as_str() {
        "redirect_console" => "redirectConsole".into(),
        "chrome_path" => "chromePath".into(),
        "binding_prefix" => "bindingPrefix".into(),
        _ => key.into(),
    })
}

impl RunnerConfig {
    /// Loads configuration relative to the process working directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a source is missing or malformed.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_from(cli, &cwd)
    }

    /// Loads configuration, looking for the default file in `cwd`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a source is missing or malformed.
    pub fn load_from(cli: &Cli, cwd: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        match &cli.config {
            Some(path) => {
                let path = cwd.join(path);
                if !path.exists() {
                    return Err(ConfigError::NotFound(path).into());
                }
                figment = figment.merge(Json::file(path));
            }
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    figment = figment.merge(Json::file(default_path));
                }
            }
        }

        figment = figment
            .merge(env_provider())
            .merge(Serialized::defaults(CliOverrides::from(cli)));

        figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }

    /// Run options for `url`.
    #[must_use]
    pub fn run_options(&self, url: impl Into<String>) -> RunOptions {
        RunOptions::new(url)
            .with_timeout(Duration::from_millis(self.timeout))
            .with_redirect_console(self.redirect_console)
    }

    /// Browser launch settings.
    #[must_use]
    pub fn browser_config(&self) -> TestBrowserConfig {
        let mut config = TestBrowserConfig::new();
        if !self.headless {
            config = config.visible();
        }
        if let Some(path) = &self.chrome_path {
            config = config.with_chrome_path(path.clone());
        }
        config
    }
}
