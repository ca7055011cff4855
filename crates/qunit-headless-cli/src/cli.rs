//! Command-line interface definition.
//!
//! One positional target and an optional positional timeout, plus flags for
//! console redirection, JSON output and browser selection.

use clap::Parser;
use std::path::PathBuf;

/// Run a QUnit suite in headless Chrome and print its results
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "qunit-headless",
    version,
    about = "Run a QUnit suite in headless Chrome",
    long_about = "Opens a QUnit test page in headless Chrome, collects every module, test\n\
                  and assertion, and prints the results. Exits with status 1 when any\n\
                  assertion fails or the run does not finish."
)]
pub struct Cli {
    /// URL or path of the HTML page that runs the suite
    ///
    /// `http://`, `https://` and `file://` URLs are used as given; filesystem
    /// paths are resolved against the working directory.
    pub target: String,

    /// Deadline for the whole run, in milliseconds (default: 30000)
    pub timeout: Option<u64>,

    /// Print the page's console output while the suite runs
    #[arg(long)]
    pub redirect_console: bool,

    /// Also write the report as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Configuration file (default: qunit-headless.json if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Chrome/Chromium executable to launch
    #[arg(long, value_name = "PATH")]
    pub chrome_path: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub visible: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all log output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_target_and_timeout() {
        let cli = Cli::try_parse_from(["qunit-headless", "test/index.html", "5000"]).unwrap();
        assert_eq!(cli.target, "test/index.html");
        assert_eq!(cli.timeout, Some(5000));
        assert!(!cli.redirect_console);
    }

    #[test]
    fn timeout_is_optional() {
        let cli = Cli::try_parse_from(["qunit-headless", "http://localhost/t.html"]).unwrap();
        assert_eq!(cli.timeout, None);
    }

    #[test]
    fn rejects_extra_positionals() {
        assert!(Cli::try_parse_from(["qunit-headless", "a.html", "10", "extra"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        assert!(Cli::try_parse_from(["qunit-headless", "a.html", "soon"]).is_err());
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["qunit-headless", "a.html", "-v", "-q"]).is_err());
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "qunit-headless",
            "a.html",
            "--redirect-console",
            "--json",
            "out/report.json",
            "--chrome-path",
            "/usr/bin/chromium",
            "--visible",
        ])
        .unwrap();
        assert!(cli.redirect_console);
        assert_eq!(cli.json, Some(PathBuf::from("out/report.json")));
        assert_eq!(cli.chrome_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(cli.visible);
    }
}
