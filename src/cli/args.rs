//! CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::models::request::{ExtractRequest, Verbosity};

/// Extract macOS SDKs from an Apple Command Line Tools DMG into a per-user cache
#[derive(Parser, Debug)]
#[command(name = "macsdk-fetch")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Command Line Tools DMG
    pub dmg_path: PathBuf,

    /// Increase output detail (repeatable: -v, -vv, ...)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only show the progress bar, no per-step messages
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl CliArgs {
    /// Get the verbosity level implied by the parsed flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// Build an [`ExtractRequest`] from the parsed arguments.
    pub fn to_extract_request(&self) -> ExtractRequest {
        ExtractRequest::new(self.dmg_path.clone()).with_verbosity(self.verbosity())
    }
}
