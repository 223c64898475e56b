//! Error types for the SDK fetch pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes matching the CLI contract.
///
/// Unlike a packager with several distinct failure shapes, this pipeline's
/// contract only distinguishes success from failure, so every fatal variant
/// maps to [`exit_codes::ERROR`]. The mapping is kept as a method (rather than
/// a constant returned from `main`) so new variants are forced through the
/// same `match` and can't silently fall through to the wrong code.
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// Any fatal failure
    pub const ERROR: i32 = 1;
}

/// Result type for SDK fetch operations.
pub type FetchResult<T> = Result<T, SdkFetchError>;

/// Errors that can occur while extracting an SDK from a Command Line Tools DMG.
#[derive(Error, Debug)]
pub enum SdkFetchError {
    /// The DMG path (or an intermediate file the pipeline expected to produce) is missing.
    #[error("input not found: {path}")]
    InputMissing { path: PathBuf },

    /// The external DMG/PKG extractor process failed.
    #[error("failed to extract package from DMG (is 7z installed?): {reason}")]
    DmgExtractFailed { reason: String },

    /// The XAR archive's header, TOC, or heap was malformed.
    #[error("invalid XAR archive: {reason}")]
    XarFormat { reason: String },

    /// The PBZX stream's header or chunk framing was malformed.
    #[error("invalid PBZX stream: {reason}")]
    PbzxFormat { reason: String },

    /// The PBZX decoder made no forward progress decoding a chunk.
    ///
    /// Part of the error taxonomy for API completeness; see
    /// `formats::pbzx::PbzxReader::refill` for why this crate's decode
    /// strategy cannot currently construct it.
    #[error("PBZX decoder stalled while decompressing a chunk")]
    PbzxStall,

    /// The CPIO stream could not be resynchronized to a known header magic.
    #[error("invalid CPIO archive: {reason}")]
    CpioFormat { reason: String },

    /// No `.sdk` directory was found under the extracted Command Line Tools tree.
    #[error("no .sdk directory found under {path}")]
    SdkMissing { path: PathBuf },

    /// I/O error wrapper, covering writes into the output tree and cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkFetchError {
    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SdkFetchError::InputMissing { .. }
            | SdkFetchError::DmgExtractFailed { .. }
            | SdkFetchError::XarFormat { .. }
            | SdkFetchError::PbzxFormat { .. }
            | SdkFetchError::PbzxStall
            | SdkFetchError::CpioFormat { .. }
            | SdkFetchError::SdkMissing { .. }
            | SdkFetchError::Io(_) => exit_codes::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_maps_to_error_exit_code() {
        let err = SdkFetchError::InputMissing {
            path: PathBuf::from("/tmp/clt.dmg"),
        };
        assert_eq!(err.exit_code(), exit_codes::ERROR);

        let err = SdkFetchError::PbzxStall;
        assert_eq!(err.exit_code(), exit_codes::ERROR);

        let err = SdkFetchError::SdkMissing {
            path: PathBuf::from("/tmp/extracted"),
        };
        assert_eq!(err.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn io_error_is_wrapped_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SdkFetchError = io_err.into();
        assert!(matches!(err, SdkFetchError::Io(_)));
    }
}
