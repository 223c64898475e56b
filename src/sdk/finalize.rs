//! SDK-layout finalizer.
//!
//! Locates every `.sdk` directory produced by the CPIO extraction stage and
//! installs it into the per-user cache, replaying symlinks and merging in the
//! Command Line Tools' libc++ headers when an SDK doesn't ship its own.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::models::error::SdkFetchError;
use crate::models::request::Verbosity;
use crate::sdk::cache::cache_root;

/// Install every `.sdk` directory found under `extracted_root` (the CPIO
/// output tree) into the cache, returning the destination paths.
pub fn finalize_sdks(
    extracted_root: &Path,
    verbosity: Verbosity,
) -> Result<Vec<PathBuf>, SdkFetchError> {
    let clt_root = extracted_root.join("Library/Developer/CommandLineTools");
    let sdks_dir = clt_root.join("SDKs");

    let output_base = cache_root();
    std::fs::create_dir_all(&output_base)?;

    let entries = std::fs::read_dir(&sdks_dir).map_err(|_| SdkFetchError::SdkMissing {
        path: sdks_dir.clone(),
    })?;

    let mut installed = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(".sdk") {
            continue;
        }
        let src = entry.path();
        let dst = output_base.join(&name);

        if verbosity.show_messages() {
            eprintln!("sdk: installing {name}");
        }

        if dst.exists() || dst.is_symlink() {
            remove_any(&dst)?;
        }

        let metadata = std::fs::symlink_metadata(&src)?;
        if metadata.is_symlink() {
            replay_symlink(&src, &dst)?;
        } else if metadata.is_dir() {
            copy_dir_recursive(&src, &dst)?;
            merge_libcxx_headers(&clt_root, &dst, verbosity)?;
        }

        installed.push(dst);
    }

    Ok(installed)
}

fn remove_any(path: &Path) -> std::io::Result<()> {
    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.is_dir() && !metadata.is_symlink() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

#[cfg(unix)]
fn replay_symlink(src: &Path, dst: &Path) -> Result<(), SdkFetchError> {
    let target = std::fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)?;
    Ok(())
}

#[cfg(not(unix))]
fn replay_symlink(src: &Path, dst: &Path) -> Result<(), SdkFetchError> {
    let resolved = std::fs::canonicalize(src).unwrap_or_else(|_| src.to_path_buf());
    if resolved.is_dir() {
        copy_dir_recursive(&resolved, dst)?;
    }
    Ok(())
}

/// Recursively copy `src` onto `dst`, preserving file modes and replaying
/// symlinks within the subtree.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), SdkFetchError> {
    std::fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| SdkFetchError::Io(std::io::Error::other(e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir entries are rooted at src");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link_target = std::fs::read_link(entry.path())?;
            #[cfg(unix)]
            {
                let _ = std::fs::remove_file(&target);
                std::os::unix::fs::symlink(&link_target, &target)?;
            }
            #[cfg(not(unix))]
            {
                let resolved = entry.path().parent().unwrap().join(&link_target);
                if resolved.is_file() {
                    std::fs::copy(&resolved, &target)?;
                }
            }
        } else if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            #[cfg(unix)]
            {
                let mode = std::fs::metadata(entry.path())?.permissions();
                std::fs::set_permissions(&target, mode)?;
            }
        }
    }
    Ok(())
}

fn merge_libcxx_headers(
    clt_root: &Path,
    sdk_dst: &Path,
    verbosity: Verbosity,
) -> Result<(), SdkFetchError> {
    let clt_libcxx = clt_root.join("usr/include/c++/v1");
    let sdk_libcxx = sdk_dst.join("usr/include/c++/v1");

    if clt_libcxx.is_dir() && !sdk_libcxx.join("version").exists() {
        if verbosity.show_messages() {
            eprintln!("sdk: merging libc++ headers");
        }
        std::fs::create_dir_all(&sdk_libcxx)?;
        copy_dir_recursive(&clt_libcxx, &sdk_libcxx)?;
    }
    Ok(())
}
