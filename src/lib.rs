//! macsdk-fetch
//!
//! Extracts `.sdk` directories out of an Apple Command Line Tools DMG and
//! installs them into a per-user cache, by walking the DMG's inner XAR
//! package, demultiplexing its PBZX payload streams, and unpacking the CPIO
//! archives they carry.

pub mod cli;
pub mod dmg;
pub mod driver;
pub mod formats;
pub mod models;
pub mod progress;
pub mod sdk;

pub use models::error::{FetchResult, SdkFetchError};
pub use models::request::{DeploymentTarget, ExtractRequest, ExtractResult, Verbosity};
pub use sdk::{cache_root, find_sdk, finalize_sdks, sdk_settings};
