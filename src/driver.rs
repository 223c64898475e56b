//! Pipeline orchestration.
//!
//! Sequences the DMG, XAR, PBZX/CPIO, and SDK-finalization stages, owns the
//! scratch temp directory for the run, and reports progress at the fixed
//! milestones in [`crate::progress::milestones`].

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use tempfile::TempDir;

use crate::dmg::extract_pkg_from_dmg;
use crate::formats::cpio::cpio_extract;
use crate::formats::pbzx::PbzxReader;
use crate::formats::xar::xar_extract;
use crate::models::error::SdkFetchError;
use crate::models::request::{ExtractRequest, ExtractResult};
use crate::progress::{milestones, Progress};
use crate::sdk::finalize::finalize_sdks;

/// Run the full extraction pipeline for `request`.
pub fn run(request: &ExtractRequest) -> Result<ExtractResult, SdkFetchError> {
    let start = Instant::now();
    request.validate()?;

    let progress = Progress::new("Extracting macOS SDK", request.verbosity);
    progress.set(milestones::START);

    let scratch = TempDir::new()?;

    progress.step("Step 1: extracting PKG from DMG (using 7z)...");
    let pkg_path = extract_pkg_from_dmg(&request.dmg_path, scratch.path())?;
    progress.set(milestones::DMG_EXTRACTED);

    progress.step("Step 2: unpacking PKG structure...");
    let pkg_data_dir = scratch.path().join("pkg_data");
    std::fs::create_dir_all(&pkg_data_dir)?;
    xar_extract(&pkg_path, &pkg_data_dir, request.verbosity)?;
    progress.set(milestones::PKG_UNPACKED);

    progress.step("Step 3: extracting sub-package payloads...");
    let out_dir = scratch.path().join("out");
    std::fs::create_dir_all(&out_dir)?;
    extract_payloads(&pkg_data_dir, &out_dir, request.verbosity)?;
    progress.set(milestones::PAYLOADS_EXTRACTED);

    progress.step("Organizing SDKs...");
    let installed_sdks = finalize_sdks(&out_dir, request.verbosity)?;
    progress.set(milestones::SDK_ORGANIZED);

    progress.set(milestones::DONE);
    progress.finish();

    let cache_root = crate::sdk::cache::cache_root();
    if request.verbosity.show_messages() {
        eprintln!(
            "The macOS SDKs were successfully extracted to {}.",
            cache_root.display()
        );
    }

    Ok(ExtractResult {
        installed_sdks,
        cache_root,
        extract_time: start.elapsed(),
    })
}

/// Extract every sub-package's `Payload` (PBZX stream of CPIO) found directly
/// under `pkg_data_dir` into the shared `out_dir`.
fn extract_payloads(
    pkg_data_dir: &Path,
    out_dir: &Path,
    verbosity: crate::models::request::Verbosity,
) -> Result<(), SdkFetchError> {
    let entries = std::fs::read_dir(pkg_data_dir)?;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(".pkg") {
            continue;
        }
        let payload_path = entry.path().join("Payload");
        if !payload_path.is_file() {
            continue;
        }
        if verbosity.show_messages() {
            eprintln!("driver: unpacking {name}");
        }
        extract_payload(&payload_path, out_dir, verbosity)?;
    }
    Ok(())
}

fn extract_payload(
    payload_path: &Path,
    out_dir: &Path,
    verbosity: crate::models::request::Verbosity,
) -> Result<(), SdkFetchError> {
    let file = File::open(payload_path).map_err(|_| SdkFetchError::InputMissing {
        path: payload_path.to_path_buf(),
    })?;
    let mut reader = PbzxReader::open(file)?;
    match cpio_extract(&mut reader, out_dir, verbosity) {
        Ok(()) => Ok(()),
        Err(SdkFetchError::CpioFormat { reason }) => {
            // A CpioFormat surfacing from a PbzxReader source might actually be a
            // PBZX-layer failure (cpio_extract can't distinguish an io::Error that
            // originated in the reader's chunk framing from a genuine cpio error).
            if let Some(pbzx_err) = reader.take_error() {
                Err(pbzx_err)
            } else {
                Err(SdkFetchError::CpioFormat { reason })
            }
        }
        Err(other) => Err(other),
    }
}
