//! Binary container format readers used by the extraction pipeline.
//!
//! Three nested formats are decoded here, outermost first: [`xar`] (the PKG
//! container), [`pbzx`] (the Payload's chunked compression framing), and
//! [`cpio`] (the archive carried inside the decompressed Payload stream).

pub mod cpio;
pub mod pbzx;
pub mod xar;

use std::path::{Component, Path, PathBuf};

use crate::models::error::SdkFetchError;

/// Join `name` onto `root`, rejecting any path that would escape `root`.
///
/// Both the XAR TOC walker and the CPIO entry reader consume names taken
/// directly from archive bytes; neither format guarantees those names are
/// free of `..` components, so every join goes through this helper rather
/// than a bare `root.join(name)`. The caller supplies `on_escape` so the
/// resulting error is attributed to the calling stage (`XarFormat` from the
/// XAR reader, `CpioFormat` from the CPIO reader) rather than hardcoding one.
pub fn join_checked(
    root: &Path,
    name: &str,
    on_escape: impl Fn(String) -> SdkFetchError,
) -> Result<PathBuf, SdkFetchError> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(on_escape(format!("entry name escapes output root: {name}")));
            }
        }
    }
    if !resolved.starts_with(root) {
        return Err(on_escape(format!(
            "entry name escapes output root: {name}"
        )));
    }
    Ok(resolved)
}
