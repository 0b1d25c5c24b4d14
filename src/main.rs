//! Binary entry point for the `streampress` command-line tool.

use std::process::ExitCode;

fn main() -> ExitCode {
    match streampress::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("streampress: {err:#}");
            ExitCode::FAILURE
        }
    }
}
