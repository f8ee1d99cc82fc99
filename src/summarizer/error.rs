//! Error types for the summarizer module

use crate::error::{Error as CrateError, SiteError};
use rig::completion::CompletionError;
use thiserror::Error;

/// Error type for a single abstractive summarization call
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The completion model reported an error
    #[error("model error: {0}")]
    Model(#[from] CompletionError),

    /// The model returned no text
    #[error("model returned an empty summary")]
    EmptyResponse,

    /// The call exceeded its timeout
    #[error("model call timed out after {0}ms")]
    Timeout(u128),

    /// The text splits into more chunks than the model is asked about
    #[error("{0} chunks exceed the limit of {1}")]
    TooManyChunks(usize, usize),

    /// All calls together exceeded the summarization budget
    #[error("summarization exceeded its {0}ms budget")]
    BudgetExceeded(u128),

    /// No model is configured
    #[error("no summarization model configured")]
    Unavailable,
}

impl From<SummarizeError> for CrateError {
    fn from(err: SummarizeError) -> Self {
        CrateError::Summarize(err.to_string())
    }
}

impl From<SummarizeError> for SiteError {
    fn from(err: SummarizeError) -> Self {
        SiteError::SummarizationFailure(err.to_string())
    }
}
