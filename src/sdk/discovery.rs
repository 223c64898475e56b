//! SDK discovery for a downstream cross-compiler driver.
//!
//! Exposed as library functions so code embedding this crate can locate an
//! installed SDK and read its deployment-target metadata without
//! re-implementing the search.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::error::SdkFetchError;
use crate::models::request::DeploymentTarget;
use crate::sdk::cache::cache_root;

#[cfg(target_os = "macos")]
const XCODE_SYSROOT: &str =
    "/Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs/MacOSX.sdk";
#[cfg(target_os = "macos")]
const COMMANDLINE_TOOL_SYSROOT: &str = "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk";

/// Find an installed macOS SDK.
///
/// On macOS this prefers the system-provided Xcode/Command Line Tools SDKs
/// over anything this crate cached itself; elsewhere it scans the cache
/// directory and picks the lexicographically largest `.sdk` name, which
/// naturally prefers a versioned SDK (`MacOSX14.sdk`) over the unversioned one.
pub fn find_sdk() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        if Path::new(XCODE_SYSROOT).is_dir() {
            return Some(PathBuf::from(XCODE_SYSROOT));
        }
        if Path::new(COMMANDLINE_TOOL_SYSROOT).is_dir() {
            return Some(PathBuf::from(COMMANDLINE_TOOL_SYSROOT));
        }
    }

    let cache = cache_root();
    let entries = std::fs::read_dir(&cache).ok()?;
    let mut best: Option<String> = None;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(".sdk") && best.as_deref().is_none_or(|b| name.as_str() > b) {
            best = Some(name);
        }
    }
    best.map(|name| cache.join(name))
}

#[derive(Debug, Deserialize)]
struct SdkSettingsJson {
    #[serde(rename = "SupportedTargets")]
    supported_targets: SupportedTargets,
}

#[derive(Debug, Deserialize)]
struct SupportedTargets {
    macosx: MacosxTarget,
}

#[derive(Debug, Deserialize)]
struct MacosxTarget {
    #[serde(rename = "DefaultDeploymentTarget")]
    default_deployment_target: String,
    #[serde(rename = "MinimumDeploymentTarget")]
    minimum_deployment_target: String,
}

/// Parsed `SDKSettings.json` contents for an installed SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdkSettings {
    pub default_deployment_target: DeploymentTarget,
    pub minimum_deployment_target: DeploymentTarget,
}

/// Read and parse `<sdk_path>/SDKSettings.json`.
pub fn sdk_settings(sdk_path: &Path) -> Result<SdkSettings, SdkFetchError> {
    let settings_path = sdk_path.join("SDKSettings.json");
    let text = std::fs::read_to_string(&settings_path).map_err(|_| SdkFetchError::SdkMissing {
        path: sdk_path.to_path_buf(),
    })?;

    let parsed: SdkSettingsJson =
        serde_json::from_str(&text).map_err(|_| SdkFetchError::SdkMissing {
            path: sdk_path.to_path_buf(),
        })?;

    let default_deployment_target = DeploymentTarget::parse(
        &parsed.supported_targets.macosx.default_deployment_target,
    )
    .ok_or_else(|| SdkFetchError::SdkMissing {
        path: sdk_path.to_path_buf(),
    })?;
    let minimum_deployment_target = DeploymentTarget::parse(
        &parsed.supported_targets.macosx.minimum_deployment_target,
    )
    .ok_or_else(|| SdkFetchError::SdkMissing {
        path: sdk_path.to_path_buf(),
    })?;

    Ok(SdkSettings {
        default_deployment_target,
        minimum_deployment_target,
    })
}
