//! # Mock Completion Model
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! without making API calls. It can be scripted to return a fixed response,
//! echo the prompt back, or fail, optionally after a delay, and counts the
//! requests it received.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    message::{Message, UserContent},
    one_or_many::OneOrMany,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Behavior {
    /// Empty text response
    Empty,
    Respond(OneOrMany<AssistantContent>),
    /// Reply with the first `n` characters of the prompt
    Echo(usize),
    Fail(String),
}

/// A mock completion model for tests and offline runs.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    behavior: Arc<Mutex<Behavior>>,
    latency: Arc<Mutex<Duration>>,
    calls: Arc<AtomicUsize>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return an empty text response.
    pub fn new() -> Self {
        Self {
            behavior: Arc::new(Mutex::new(Behavior::Empty)),
            latency: Arc::new(Mutex::new(Duration::ZERO)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the response that the mock model should return.
    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        *self.behavior.lock().await = Behavior::Respond(response);
    }

    /// Helper to create a simple text response.
    pub async fn set_text_response(&self, text: &str) {
        self.set_response(OneOrMany::one(AssistantContent::text(text))).await;
    }

    /// Reply with a prefix of the prompt text.
    pub async fn set_echo(&self, max_chars: usize) {
        *self.behavior.lock().await = Behavior::Echo(max_chars);
    }

    /// Fail every request with a provider error.
    pub async fn set_failure(&self, message: &str) {
        *self.behavior.lock().await = Behavior::Fail(message.to_string());
    }

    /// Sleep this long before answering each request.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    /// Number of completion requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_text(request: &CompletionRequest) -> String {
    match &request.prompt {
        Message::User { content } => content
            .iter()
            .filter_map(|c| match c {
                UserContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
        Message::Assistant { .. } => String::new(),
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let behavior = self.behavior.lock().await.clone();

        let choice = match behavior {
            Behavior::Empty => OneOrMany::one(AssistantContent::text("")),
            Behavior::Respond(choice) => choice,
            Behavior::Echo(max_chars) => {
                let prompt = prompt_text(&completion_request);
                OneOrMany::one(AssistantContent::text(
                    prompt.chars().take(max_chars).collect::<String>(),
                ))
            }
            Behavior::Fail(message) => return Err(CompletionError::ProviderError(message)),
        };

        Ok(CompletionResponse {
            choice,
            raw_response: String::new(),
        })
    }
}
