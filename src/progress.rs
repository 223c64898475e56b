//! Percent-based progress reporting.
//!
//! The pipeline reports progress at fixed milestones as each stage completes
//! rather than per-byte, mirroring the coarse single-line progress UI of the
//! tooling this crate replaces. Backed by [`indicatif`] so the bar redraws
//! itself in place instead of scrolling the terminal.

use indicatif::{ProgressBar, ProgressStyle};

use crate::models::request::Verbosity;

/// Fixed milestones the driver reports at each stage boundary.
pub mod milestones {
    pub const START: u64 = 0;
    pub const DMG_EXTRACTED: u64 = 10;
    pub const PKG_UNPACKED: u64 = 20;
    pub const PAYLOADS_EXTRACTED: u64 = 75;
    pub const SDK_ORGANIZED: u64 = 98;
    pub const DONE: u64 = 100;
}

/// Wraps an [`indicatif::ProgressBar`], suppressed entirely at [`Verbosity::Quiet`]... actually
/// shown as a bar at every level, since Quiet means "bar only" per the CLI contract.
pub struct Progress {
    bar: Option<ProgressBar>,
    verbosity: Verbosity,
}

impl Progress {
    /// Create a progress reporter for `label`, percent range 0-100.
    pub fn new(label: &str, verbosity: Verbosity) -> Self {
        let bar = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40}] {percent}%")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message(label.to_string());
            Some(bar)
        } else {
            None
        };
        Self { bar, verbosity }
    }

    /// Advance the bar to an absolute percent milestone.
    pub fn set(&self, percent: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(percent.min(100));
        }
    }

    /// Print a per-step message, gated on verbosity.
    pub fn step(&self, message: &str) {
        if self.verbosity.show_messages() {
            if let Some(bar) = &self.bar {
                bar.println(message);
            } else {
                eprintln!("{message}");
            }
        }
    }

    /// Finish and clear the bar.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
