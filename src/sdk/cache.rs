//! Cache directory discovery.
//!
//! Mirrors the lookup order of the original C++ tooling this pipeline
//! replaces: a platform cache environment variable, then a home-directory
//! fallback, then a directory next to the running executable.

use std::path::PathBuf;

/// Resolve `<cache_root>/c3/macos_sdk`, creating no directories.
pub fn cache_root() -> PathBuf {
    if let Some(env_path) = platform_cache_env() {
        return PathBuf::from(env_path).join("c3/macos_sdk");
    }

    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return PathBuf::from(home).join(".cache/c3/macos_sdk");
        }
    }

    executable_dir().join("macos_sdk")
}

#[cfg(windows)]
fn platform_cache_env() -> Option<String> {
    std::env::var("LOCALAPPDATA")
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(not(windows))]
fn platform_cache_env() -> Option<String> {
    std::env::var("XDG_CACHE_HOME")
        .ok()
        .filter(|v| !v.is_empty())
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}
