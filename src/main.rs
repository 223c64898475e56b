//! macsdk-fetch - extracts macOS SDKs from an Apple Command Line Tools DMG
//! into a per-user cache.

use std::process::ExitCode;

use clap::Parser;

use macsdk_fetch::cli::args::CliArgs;
use macsdk_fetch::cli::run;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    run(args)
}
