//! # LLM Client Module
//!
//! Completion models used by the summarizer, with built-in rate limiting to
//! prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `Client`: wraps a rate-limited completion model
//! - `RateLimitedCompletionModel`: adds a governor limiter to any completion model
//! - `MockCompletionModel`: scripted model for tests and offline runs

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use rig::{completion::CompletionModel, providers::gemini};

use crate::error::{Error, Result};

pub mod mock_model;
pub mod ratelimited_completion;

/// Requests per minute on the paid tier
const GEMINI_QUOTA: u32 = 2000;
/// Requests per minute on the free tier
const GEMINI_FREE_QUOTA: u32 = 30;

#[derive(Debug, Clone)]
pub struct Client<C>
where
    C: CompletionModel,
{
    completion_model: C,
}

#[derive(Debug)]
pub struct RateLimitResponse<T> {
    #[allow(dead_code)]
    response: T,
}

impl Client<RateLimitedCompletionModel<gemini::completion::CompletionModel>> {
    /// Build a paid-tier client from `GEMINI_API_KEY`
    pub fn new_gemini_from_env() -> Result<Self> {
        let gemini_client = gemini::Client::new(&api_key("GEMINI_API_KEY")?);
        Ok(Self::new_gemini(gemini_client, "gemini-2.0-flash", GEMINI_QUOTA))
    }

    /// Build a free-tier client from `GEMINI_FREE_API_KEY`
    pub fn new_gemini_free_from_env() -> Result<Self> {
        let gemini_client = gemini::Client::new(&api_key("GEMINI_FREE_API_KEY")?);
        Ok(Self::new_gemini(
            gemini_client,
            "gemini-2.0-flash-lite",
            GEMINI_FREE_QUOTA,
        ))
    }

    pub fn new_gemini(gemini_client: gemini::Client, model: &str, per_minute: u32) -> Self {
        let quota = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let completion_limiter = RateLimiter::direct(Quota::per_minute(quota));
        let completion_model =
            RateLimitedCompletionModel::new(gemini_client.completion_model(model), completion_limiter);
        Self { completion_model }
    }
}

impl<C> Client<C>
where
    C: CompletionModel,
{
    pub fn new(completion_model: C) -> Self {
        Self { completion_model }
    }

    pub fn completion(&self) -> &C {
        &self.completion_model
    }

    pub fn into_completion(self) -> C {
        self.completion_model
    }
}

fn api_key(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| Error::Config(format!("{var} environment variable must be set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_model::MockCompletionModel;

    #[test]
    fn test_missing_api_key() {
        let err = api_key("SITELENS_TEST_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("SITELENS_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_generic_client() {
        let client = Client::new(MockCompletionModel::new());
        let _model: &MockCompletionModel = client.completion();
    }
}
