//! Status message functions for terminal output.
//!
//! Status lines go to stderr so stdout carries only the report.

use owo_colors::OwoColorize;

/// Print a success message to stderr.
///
/// # Examples
///
/// ```no_run
/// use qunit_headless_cli::ui::success;
///
/// success("All assertions passed");
/// ```
pub fn success(message: &str) {
    super::emit_err(&format!("{} {}", "✓".green().bold(), message));
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    super::emit_err(&format!("{} {}", "ℹ".blue().bold(), message));
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    super::emit_err(&format!("{} {}", "⚠".yellow().bold(), message.yellow()));
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    super::emit_err(&format!("{} {}", "✗".red().bold(), message.red()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        // These should not panic
        success("Success message");
        info("Info message");
        warning("Warning message");
        error("Error message");
    }
}
