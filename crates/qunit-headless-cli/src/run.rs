//! The run command: resolve the target, run the suite, present the report.

use crate::cli::Cli;
use crate::config::RunnerConfig;
use crate::error::{CliError, Result};
use crate::target::normalize_target_from_cwd;
use crate::ui::{self, Spinner};
use qunit_headless::{Report, Runner};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Execute one run as described by `cli`.
///
/// A report with failed assertions is still `Ok`; the caller decides the
/// exit status from it.
///
/// # Errors
///
/// Returns an error for an invalid target or configuration, for a run that
/// could not finish, or when the JSON report cannot be written.
pub async fn execute(cli: &Cli) -> Result<Report> {
    let url = normalize_target_from_cwd(&cli.target)?;
    let config = RunnerConfig::load(cli)?;
    debug!(?config, "resolved configuration");

    ui::info(&format!("Target URL is {url}, timeout is {}", config.timeout));

    let options = config.run_options(url);
    let runner = Runner::chrome(config.browser_config())
        .with_binding_prefix(config.binding_prefix.clone());

    let spinner = ui::spinner_enabled(options.redirect_console)
        .then(|| Spinner::new("Running tests..."));

    let outcome = runner.run(&options).await;

    if let Some(spinner) = &spinner {
        match &outcome {
            Ok(report) if report.is_success() => spinner.finish("Run finished"),
            Ok(report) => spinner.fail(&format!(
                "Run finished with {} failed assertions",
                report.stats.failed
            )),
            Err(_) => spinner.fail("Run did not finish"),
        }
    }

    let report = outcome?;

    ui::print_output(&report);
    ui::print_summary(&report);
    if report.stats.failed > 0 {
        ui::print_failed_tests(&report);
    }

    if let Some(path) = &cli.json {
        write_report(&report, path)?;
        ui::success(&format!("Report written to {}", path.display()));
    }

    Ok(report)
}

/// Write `report` as pretty JSON, creating parent directories as needed.
///
/// # Errors
///
/// Returns `WriteReport` when the file or its directory cannot be written.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json.as_bytes())
    };

    write(path).map_err(|source| CliError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}
