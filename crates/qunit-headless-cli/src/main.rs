//! qunit-headless: run a QUnit suite in headless Chrome.
//!
//! Exit status is 0 when every assertion passed, 1 when any failed or the
//! run could not finish, and 2 for argument errors.

use clap::Parser;
use qunit_headless_cli::{cli::Cli, error, logger, run, ui};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    match run::execute(&args).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{:?}", error::cli_error_to_miette(err));
            ExitCode::FAILURE
        }
    }
}
