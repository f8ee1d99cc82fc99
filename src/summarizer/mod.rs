//! # Summarizer Module
//!
//! Reduces extracted page text to a short synopsis.
//!
//! Text is split into fixed-size character chunks. Each chunk is summarized
//! independently by a completion model and the per-chunk summaries are
//! joined in order. The whole text is summarized extractively instead (the
//! first few substantial sentences, verbatim) when no model is configured,
//! when the text has more than `max_chunks` chunks, when the calls together
//! overrun `total_timeout`, or when any call fails or answers with nothing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitelens::model::mock_model::MockCompletionModel;
//! use sitelens::summarizer::{Summarizer, SummarizerConfig};
//!
//! # async fn run() {
//! let model = MockCompletionModel::new();
//! model.set_text_response("A volunteer sign-up form for a food bank.").await;
//!
//! let summarizer = Summarizer::new(model, SummarizerConfig::default());
//! let summary = summarizer.summarize("...page text...").await;
//! # }
//! ```

mod config;
mod error;
mod extractive;

pub use config::{SummarizerConfig, SummarizerConfigBuilder};
pub use error::SummarizeError;

use rig::completion::{AssistantContent, CompletionModel};
use tracing::{debug, instrument, warn};

use crate::error::SiteError;
use crate::extractor::{ensure_terminal_punctuation, normalize_whitespace};

/// Returned for empty input
pub const NO_CONTENT: &str = "No meaningful content found.";

/// Chunked abstractive summarizer with an extractive fallback
#[derive(Debug, Clone)]
pub struct Summarizer<M: CompletionModel> {
    model: Option<M>,
    config: SummarizerConfig,
}

impl<M: CompletionModel> Summarizer<M> {
    /// Summarize with `model`, falling back to extraction on failure
    pub fn new(model: M, config: SummarizerConfig) -> Self {
        Self {
            model: Some(model),
            config,
        }
    }

    /// Summarize extractively without calling any model
    pub fn extractive_only(config: SummarizerConfig) -> Self {
        Self { model: None, config }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize `text`. Never fails; non-empty input yields non-empty output.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn summarize(&self, text: &str) -> String {
        let text = normalize_whitespace(text);
        if text.is_empty() {
            return NO_CONTENT.to_string();
        }
        if text.chars().count() < self.config.min_input_len {
            return text;
        }

        let chunks = chunk_text(&text, self.config.chunk_size, self.config.min_chunk_len);
        let summary = match self.abstractive(&chunks).await {
            Ok(summary) => summary,
            Err(e) => {
                let degraded = SiteError::from(e);
                match self.model {
                    Some(_) => warn!("Falling back to extractive summary: {}", degraded),
                    None => debug!("Using extractive summary: {}", degraded),
                }
                self.extractive(&text)
            }
        };

        ensure_terminal_punctuation(&normalize_whitespace(&summary))
    }

    async fn abstractive(&self, chunks: &[String]) -> Result<String, SummarizeError> {
        let model = self.model.as_ref().ok_or(SummarizeError::Unavailable)?;
        if chunks.is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }
        if chunks.len() > self.config.max_chunks {
            return Err(SummarizeError::TooManyChunks(chunks.len(), self.config.max_chunks));
        }

        let budget = self.config.total_timeout;
        let calls = async {
            let mut summaries = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                let summary = self.summarize_chunk(model, chunk).await?;
                debug!("Chunk {}/{} summarized", i + 1, chunks.len());
                summaries.push(summary);
            }
            Ok::<_, SummarizeError>(summaries.join(" "))
        };
        tokio::time::timeout(budget, calls)
            .await
            .map_err(|_| SummarizeError::BudgetExceeded(budget.as_millis()))?
    }

    async fn summarize_chunk(&self, model: &M, chunk: &str) -> Result<String, SummarizeError> {
        let preamble = format!(
            "Summarize the following website text in {} to {} words. \
             Reply with the summary only, as plain prose.",
            self.config.min_summary_len, self.config.max_summary_len
        );
        let request = model
            .completion_request(chunk)
            .preamble(preamble)
            .max_tokens(self.config.max_summary_len)
            .send();

        let response = tokio::time::timeout(self.config.call_timeout, request)
            .await
            .map_err(|_| SummarizeError::Timeout(self.config.call_timeout.as_millis()))??;

        let text = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        let text = normalize_whitespace(&text);
        if text.is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }
        Ok(text)
    }

    fn extractive(&self, text: &str) -> String {
        let summary = extractive::extractive_summary(
            text,
            self.config.extractive_sentences,
            self.config.min_sentence_len,
        );
        if summary.is_empty() {
            // No sentence long enough; keep the opening chunk instead
            text.chars().take(self.config.chunk_size).collect()
        } else {
            summary
        }
    }
}

/// Fixed-size character chunks in order, dropping those shorter than `min_len`
pub fn chunk_text(text: &str, chunk_size: usize, min_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .filter(|chunk| chunk.len() >= min_len)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
