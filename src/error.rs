//! Error types for the sitelens crate

use thiserror::Error;

/// Result type for sitelens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sitelens operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Page fetching error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Technology detection error
    #[error("Detect error: {0}")]
    Detect(String),

    /// Summarization error
    #[error("Summarize error: {0}")]
    Summarize(String),

    /// Checkpoint persistence error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Failure and degradation kinds observed while analyzing a single site.
///
/// None of these ever escapes a worker task: fatal kinds are folded into a
/// failed `AnalysisRecord`, degraded kinds are logged and processing
/// continues with partial data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SiteError {
    /// Unreachable host, timeout, or a response that prevents extraction
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Headless navigation failed
    #[error("render failure: {0}")]
    RenderFailure(String),

    /// No usable text was found in the page
    #[error("no usable text extracted")]
    ExtractionEmpty,

    /// The external detector was unavailable; signature matches were kept
    #[error("classification partial: {0}")]
    ClassificationPartial(String),

    /// The summarization model was unavailable; extractive fallback used
    #[error("summarization failure: {0}")]
    SummarizationFailure(String),

    /// The per-URL deadline elapsed
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// Anything else, including a panicked worker
    #[error("unknown exception: {0}")]
    UnknownException(String),
}

impl SiteError {
    /// Whether this kind terminates the URL with a failed record
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SiteError::NetworkFailure(_)
                | SiteError::RenderFailure(_)
                | SiteError::Timeout(_)
                | SiteError::UnknownException(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        assert!(SiteError::NetworkFailure("refused".into()).is_fatal());
        assert!(SiteError::Timeout(10).is_fatal());
        assert!(!SiteError::ExtractionEmpty.is_fatal());
        assert!(!SiteError::ClassificationPartial("down".into()).is_fatal());
        assert!(!SiteError::SummarizationFailure("quota".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(SiteError::Timeout(120).to_string(), "timed out after 120s");
        assert_eq!(
            Error::Fetch("boom".to_string()).to_string(),
            "Fetch error: boom"
        );
    }
}
