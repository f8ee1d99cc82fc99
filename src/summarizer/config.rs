//! # Summarizer Configuration Module
//!
//! Chunking, length bounds and fallback parameters for the summarizer.
//!
//! ## Key Components
//!
//! - `SummarizerConfig`: The configuration struct
//! - `SummarizerConfigBuilder`: Builder pattern implementation for easier configuration

use std::time::Duration;

/// Configuration for the summarizer
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Size of each chunk in characters
    pub chunk_size: usize,

    /// Chunks shorter than this many characters are dropped
    pub min_chunk_len: usize,

    /// Inputs shorter than this many characters are returned verbatim
    pub min_input_len: usize,

    /// Lower bound on the length of each chunk summary, in words
    pub min_summary_len: u64,

    /// Upper bound on the length of each chunk summary, in tokens
    pub max_summary_len: u64,

    /// Sentences kept by the extractive fallback
    pub extractive_sentences: usize,

    /// Sentences of this many characters or fewer are skipped by the fallback
    pub min_sentence_len: usize,

    /// Timeout for each model call
    pub call_timeout: Duration,

    /// Texts splitting into more chunks than this are summarized extractively
    pub max_chunks: usize,

    /// Budget for all model calls of one text, rate-limit waits included
    pub total_timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            min_chunk_len: 50,
            min_input_len: 50,
            min_summary_len: 50,
            max_summary_len: 150,
            extractive_sentences: 3,
            min_sentence_len: 20,
            call_timeout: Duration::from_secs(30),
            max_chunks: 8,
            total_timeout: Duration::from_secs(60),
        }
    }
}

/// Builder for SummarizerConfig
#[derive(Debug, Default)]
pub struct SummarizerConfigBuilder {
    config: SummarizerConfig,
}

impl SummarizerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: SummarizerConfig::default(),
        }
    }

    /// Set the chunk size
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the minimum chunk length
    pub fn min_chunk_len(mut self, len: usize) -> Self {
        self.config.min_chunk_len = len;
        self
    }

    /// Set the minimum input length
    pub fn min_input_len(mut self, len: usize) -> Self {
        self.config.min_input_len = len;
        self
    }

    /// Set the summary length bounds
    pub fn summary_len(mut self, min: u64, max: u64) -> Self {
        self.config.min_summary_len = min.min(max);
        self.config.max_summary_len = max.max(min);
        self
    }

    /// Set how many sentences the extractive fallback keeps
    pub fn extractive_sentences(mut self, count: usize) -> Self {
        self.config.extractive_sentences = count;
        self
    }

    /// Set the minimum sentence length for the extractive fallback
    pub fn min_sentence_len(mut self, len: usize) -> Self {
        self.config.min_sentence_len = len;
        self
    }

    /// Set the per-call timeout
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Set the maximum number of chunks sent to the model
    pub fn max_chunks(mut self, max_chunks: usize) -> Self {
        self.config.max_chunks = max_chunks;
        self
    }

    /// Set the budget for all model calls of one text
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.config.total_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> SummarizerConfig {
        self.config
    }
}

impl SummarizerConfig {
    /// Create a new builder
    pub fn builder() -> SummarizerConfigBuilder {
        SummarizerConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SummarizerConfig::builder()
            .chunk_size(0)
            .summary_len(200, 100)
            .call_timeout(Duration::from_secs(5))
            .max_chunks(4)
            .build();

        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.min_summary_len, 100);
        assert_eq!(config.max_summary_len, 200);
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.extractive_sentences, 3);
        assert_eq!(config.max_chunks, 4);
        assert_eq!(config.total_timeout, Duration::from_secs(60));
    }
}
