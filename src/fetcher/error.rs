//! Error types for the fetcher module

use crate::error::{Error as CrateError, SiteError};
use thiserror::Error;

/// Error type for fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Browser could not be launched or driven
    #[error("Browser error: {0}")]
    Browser(String),

    /// Headless navigation failed
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Navigation did not finish in time
    #[error("Timed out after {0}ms")]
    Timeout(u128),

    /// Invalid fetcher configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem error while preparing a browser profile
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for FetchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        FetchError::Navigation(err.to_string())
    }
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}

impl FetchError {
    /// Classify this error for the per-URL record
    pub fn into_site_error(self, rendered: bool) -> SiteError {
        if rendered {
            SiteError::RenderFailure(self.to_string())
        } else {
            SiteError::NetworkFailure(self.to_string())
        }
    }
}
