//! Data models for the SDK fetch pipeline.

pub mod error;
pub mod request;

pub use error::{FetchResult, SdkFetchError};
pub use request::{DeploymentTarget, ExtractRequest, ExtractResult, Verbosity};
