//! Request/result data models for the SDK fetch pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::error::{FetchResult, SdkFetchError};

/// Output detail level, threaded explicitly through the driver and every
/// stage that can usefully report progress, rather than read from a
/// process-wide global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Progress bar only.
    Quiet,
    /// Progress bar plus per-step messages.
    #[default]
    Normal,
    /// Progress bar, per-step messages, and per-entry traces.
    Trace,
}

impl Verbosity {
    /// Build a verbosity level from a repeated `-v` flag count, with an
    /// explicit `--quiet` override taking precedence.
    pub fn from_flags(verbose_count: u8, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match verbose_count {
            0 => Verbosity::Quiet,
            1 => Verbosity::Normal,
            _ => Verbosity::Trace,
        }
    }

    /// Returns true if per-step messages should be printed.
    pub fn show_messages(&self) -> bool {
        matches!(self, Verbosity::Normal | Verbosity::Trace)
    }

    /// Returns true if per-entry traces should be printed.
    pub fn show_traces(&self) -> bool {
        matches!(self, Verbosity::Trace)
    }
}

/// Request to extract an SDK from a Command Line Tools DMG.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// Path to the Command Line Tools DMG.
    pub dmg_path: PathBuf,
    /// Output detail level.
    pub verbosity: Verbosity,
}

impl ExtractRequest {
    /// Create a new extract request at the default verbosity.
    pub fn new(dmg_path: PathBuf) -> Self {
        Self {
            dmg_path,
            verbosity: Verbosity::default(),
        }
    }

    /// Set the verbosity level.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Validate the request before the pipeline begins.
    pub fn validate(&self) -> FetchResult<()> {
        if !self.dmg_path.exists() {
            return Err(SdkFetchError::InputMissing {
                path: self.dmg_path.clone(),
            });
        }
        if !self.dmg_path.is_file() {
            return Err(SdkFetchError::InputMissing {
                path: self.dmg_path.clone(),
            });
        }
        Ok(())
    }
}

/// Result of a successful SDK extraction.
#[derive(Debug, Clone)]
pub struct ExtractResult {
    /// Every `.sdk` directory installed into the cache by this run.
    pub installed_sdks: Vec<PathBuf>,
    /// Root of the per-user cache the SDKs were installed under.
    pub cache_root: PathBuf,
    /// Wall-clock time spent across the whole pipeline.
    pub extract_time: Duration,
}

/// A parsed `major.minor` deployment target, e.g. `14.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub major: u32,
    pub minor: u32,
}

impl DeploymentTarget {
    /// Parse a `major.minor[.patch]` string, ignoring any trailing patch component.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some(Self { major, minor })
    }
}
