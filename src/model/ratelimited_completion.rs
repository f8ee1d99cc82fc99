use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use rig::completion::{self, CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use tracing::{Instrument, debug_span, info_span};

use super::RateLimitResponse;

/// Completion model that waits on a shared limiter before every request.
///
/// Clones share the limiter, so every summarization worker draws from one
/// quota.
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }

    pub fn inner(&self) -> &M {
        &self.model
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = RateLimitResponse<M::Response>;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<completion::CompletionResponse<Self::Response>, CompletionError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        let response = self
            .model
            .completion(completion_request)
            .instrument(info_span!("completion"))
            .await?;
        Ok(CompletionResponse {
            choice: response.choice,
            raw_response: RateLimitResponse {
                response: response.raw_response,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use governor::{Quota, RateLimiter};
    use rig::completion::{AssistantContent, CompletionModel};

    use super::*;
    use crate::model::mock_model::MockCompletionModel;

    fn limited(model: MockCompletionModel) -> RateLimitedCompletionModel<MockCompletionModel> {
        let quota = Quota::per_second(NonZeroU32::new(100).unwrap());
        RateLimitedCompletionModel::new(model, RateLimiter::direct(quota))
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let mock = MockCompletionModel::new();
        mock.set_text_response("A short summary.").await;
        let model = limited(mock.clone());

        let response = model.completion_request("text").send().await.unwrap();
        let text: Vec<String> = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(text, vec!["A short summary."]);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_passes_errors_through() {
        let mock = MockCompletionModel::new();
        mock.set_failure("quota exceeded").await;
        let model = limited(mock);

        let err = model.completion_request("text").send().await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
