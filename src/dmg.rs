//! DMG extraction stage.
//!
//! DMG decoding itself is out of scope for this crate; it is delegated to an
//! external `7z`-compatible binary, which can read the Apple disk image
//! format and stream out an inner archive member without mounting anything.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::models::error::SdkFetchError;

const PKG_GLOB: &str = "Command Line Developer Tools/Command Line Tools*.pkg";

/// Extract the Command Line Tools `.pkg` from `dmg_path` into `scratch_dir`,
/// returning the path to the extracted file.
pub fn extract_pkg_from_dmg(dmg_path: &Path, scratch_dir: &Path) -> Result<PathBuf, SdkFetchError> {
    let pkg_path = scratch_dir.join("CLT.pkg");
    let out_file = std::fs::File::create(&pkg_path)?;

    let status = Command::new("7z")
        .arg("e")
        .arg("-so")
        .arg(dmg_path)
        .arg(PKG_GLOB)
        .stdout(Stdio::from(out_file))
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(pkg_path),
        Ok(status) => Err(SdkFetchError::DmgExtractFailed {
            reason: format!("7z exited with {status}"),
        }),
        Err(e) => Err(SdkFetchError::DmgExtractFailed {
            reason: format!("could not run 7z: {e}"),
        }),
    }
}
