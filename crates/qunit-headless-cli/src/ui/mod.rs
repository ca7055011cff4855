//! Terminal UI: report rendering, status messages and the run spinner.
//!
//! Color handling is decided once by [`init_colors`]; when colors are off,
//! everything printed through this module has its ANSI codes stripped.
//!
//! # Examples
//!
//! ```no_run
//! use qunit_headless_cli::ui;
//!
//! ui::init_colors(false);
//!
//! let spinner = ui::Spinner::new("Running tests...");
//! spinner.finish("Run finished");
//!
//! ui::info("Target URL is http://localhost:8000/tests.html, timeout is 30000");
//! ```

mod format;
mod messages;
mod spinner;

pub use format::{
    format_runtime, print_failed_tests, print_output, print_summary, render_failed_tests,
    render_output, render_summary,
};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

/// Check if running in a CI environment.
///
/// Detects common CI environment variables from GitHub Actions, GitLab CI,
/// CircleCI, and Travis CI.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Check if color output should be enabled.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise colors follow whether
/// stderr is a terminal.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr()
}

/// Decide color support for the process. Call once, early in `main`.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

/// Whether a spinner may be drawn for a run.
///
/// Redirected page console output would interleave with the spinner, and CI
/// logs or pipes gain nothing from it.
pub fn spinner_enabled(redirect_console: bool) -> bool {
    !redirect_console && !is_ci() && console::user_attended_stderr()
}

fn emit(text: &str) {
    if console::colors_enabled() {
        println!("{text}");
    } else {
        println!("{}", console::strip_ansi_codes(text));
    }
}

fn emit_err(text: &str) {
    if console::colors_enabled_stderr() {
        eprintln!("{text}");
    } else {
        eprintln!("{}", console::strip_ansi_codes(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const CI_VARS: [&str; 5] = ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"];

    fn set(var: &str, value: &str) {
        // SAFETY: every test touching the environment is #[serial].
        unsafe { std::env::set_var(var, value) }
    }

    fn unset(var: &str) {
        // SAFETY: every test touching the environment is #[serial].
        unsafe { std::env::remove_var(var) }
    }

    #[test]
    #[serial]
    fn test_is_ci_with_ci_var() {
        CI_VARS.iter().for_each(|var| unset(var));
        set("CI", "true");
        assert!(is_ci());
        unset("CI");
    }

    #[test]
    #[serial]
    fn test_is_ci_with_github_actions() {
        CI_VARS.iter().for_each(|var| unset(var));
        set("GITHUB_ACTIONS", "true");
        assert!(is_ci());
        assert!(!spinner_enabled(false));
        unset("GITHUB_ACTIONS");
    }

    #[test]
    fn test_spinner_disabled_with_redirected_console() {
        assert!(!spinner_enabled(true));
    }

    #[test]
    #[serial]
    fn test_should_use_color_no_color_overrides_force() {
        set("NO_COLOR", "1");
        set("FORCE_COLOR", "1");
        assert!(!should_use_color());
        unset("NO_COLOR");
        unset("FORCE_COLOR");
    }

    #[test]
    #[serial]
    fn test_should_use_color_force_color() {
        unset("NO_COLOR");
        set("FORCE_COLOR", "1");
        assert!(should_use_color());
        unset("FORCE_COLOR");
    }

    #[test]
    #[serial]
    fn test_init_colors_no_color_flag() {
        set("FORCE_COLOR", "1");
        init_colors(true);
        assert!(!console::colors_enabled());
        assert!(!console::colors_enabled_stderr());
        unset("FORCE_COLOR");
    }
}
