//! Command-line interface module.

pub mod args;

use std::process::ExitCode;

use crate::driver;
use crate::models::error::exit_codes;

use self::args::CliArgs;

/// Run the CLI application.
pub fn run(args: CliArgs) -> ExitCode {
    let request = args.to_extract_request();

    match driver::run(&request) {
        Ok(_) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
