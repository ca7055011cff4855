//! Rendering of a finished report.
//!
//! The `render_*` functions are pure and return the text; the `print_*`
//! wrappers write it to stdout.

use owo_colors::OwoColorize;
use qunit_headless::{LogEntry, Module, Report, Test};

/// Format a millisecond runtime in human-readable form.
///
/// # Examples
///
/// ```
/// use qunit_headless_cli::ui::format_runtime;
///
/// assert_eq!(format_runtime(50.0), "50ms");
/// assert_eq!(format_runtime(1500.0), "1.50s");
/// assert_eq!(format_runtime(90_000.0), "1m 30s");
/// ```
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_runtime(ms: f64) -> String {
    let ms = ms.max(0.0);

    if ms < 1000.0 {
        format!("{}ms", ms as u64)
    } else if ms < 60_000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        let secs = (ms / 1000.0) as u64;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Every module with its tests, and the failed assertions under each
/// failing test.
pub fn render_output(report: &Report) -> String {
    let mut lines = Vec::new();

    for module in report.modules.values() {
        lines.push(format!(
            "{} {}",
            module.name.bold(),
            format!("({})", module_counts(module)).dimmed()
        ));

        for test in &module.tests {
            lines.push(format!("  {}", test_line(test)));
            if test.is_failed() {
                for entry in test.failed_assertions() {
                    lines.extend(assertion_lines(entry, "      "));
                }
            }
        }
    }

    lines.join("\n")
}

/// The pass/fail verdict and the run's aggregate counts.
pub fn render_summary(report: &Report) -> String {
    let stats = &report.stats;
    let verdict = if report.is_success() {
        "pass".green().bold().to_string()
    } else {
        "fail".red().bold().to_string()
    };

    [
        format!("Test run result: {verdict}"),
        format!("Total tests: {}", report.total_tests),
        format!("  Assertions: {}", stats.total),
        format!("  Passed assertions: {}", stats.passed),
        format!("  Failed assertions: {}", stats.failed),
        format!("  Runtime: {}", format_runtime(stats.runtime)),
    ]
    .join("\n")
}

/// Only the failing tests, as `module > test` with their failed assertions.
pub fn render_failed_tests(report: &Report) -> String {
    let mut lines = vec![format!("{}", "Failed tests:".red().bold())];

    for test in report.failed_tests() {
        lines.push(format!(
            "  {} {} {} {}",
            "✖".red(),
            test.module,
            ">".dimmed(),
            test.name.bold()
        ));
        for entry in test.failed_assertions() {
            lines.extend(assertion_lines(entry, "      "));
        }
    }

    lines.join("\n")
}

/// Print [`render_output`] to stdout.
pub fn print_output(report: &Report) {
    super::emit(&render_output(report));
}

/// Print [`render_summary`] to stdout.
pub fn print_summary(report: &Report) {
    super::emit(&format!("\n{}", render_summary(report)));
}

/// Print [`render_failed_tests`] to stdout.
pub fn print_failed_tests(report: &Report) {
    super::emit(&format!("\n{}", render_failed_tests(report)));
}

fn module_counts(module: &Module) -> String {
    match (module.total, module.passed, module.failed) {
        (Some(total), Some(passed), Some(failed)) => {
            format!("{total} assertions, {passed} passed, {failed} failed")
        }
        _ => format!("{} tests", module.tests.len()),
    }
}

fn test_line(test: &Test) -> String {
    let mark = if test.is_failed() {
        "✖".red().to_string()
    } else {
        "✔".green().to_string()
    };

    let mut line = format!("{mark} {}", test.name);

    if let (Some(total), Some(passed)) = (test.total, test.passed) {
        line.push_str(&format!(" ({passed}/{total})"));
    }
    if let Some(runtime) = test.runtime {
        line.push_str(&format!(" {}", format_runtime(runtime).dimmed()));
    }
    if test.skipped == Some(true) {
        line.push_str(&format!(" {}", "skipped".yellow()));
    }
    if test.todo == Some(true) {
        line.push_str(&format!(" {}", "todo".yellow()));
    }

    line
}

fn assertion_lines(entry: &LogEntry, indent: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);

    let message = entry.message.as_deref().unwrap_or("(no message)");
    lines.push(format!("{indent}{}", message.red()));
    lines.push(format!("{indent}  expected: {}", entry.expected.green()));
    lines.push(format!("{indent}  actual:   {}", entry.actual.red()));
    if let Some(source) = &entry.source {
        for (i, frame) in source.lines().enumerate() {
            let label = if i == 0 { "at: " } else { "    " };
            lines.push(format!("{indent}  {}", format!("{label}{}", frame.trim()).dimmed()));
        }
    }

    lines
}
