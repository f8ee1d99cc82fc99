//! # Batch Configuration Module
//!
//! ## Key Components
//!
//! - `BatchConfig`: Worker-pool size, checkpoint cadence, fetch policy and
//!   the per-URL fetch deadline
//! - `BatchConfigBuilder`: Builder pattern implementation for easier configuration

use std::time::Duration;

use crate::fetcher::FetchStrategy;

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of URLs processed at once
    pub concurrency: usize,

    /// Write a checkpoint every this many completed URLs; `0` disables checkpoints
    pub checkpoint_every: usize,

    /// How pages are fetched
    pub fetch_strategy: FetchStrategy,

    /// Deadline for fetching a single URL. Once a site has answered, its
    /// record keeps the status code; enrichment has its own budgets.
    pub url_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            checkpoint_every: 1000,
            fetch_strategy: FetchStrategy::default(),
            url_timeout: Duration::from_secs(120),
        }
    }
}

/// Builder for BatchConfig
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: BatchConfig::default(),
        }
    }

    /// Set the worker-pool size (at least one)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Set the checkpoint interval
    pub fn checkpoint_every(mut self, every: usize) -> Self {
        self.config.checkpoint_every = every;
        self
    }

    /// Set the fetch strategy
    pub fn fetch_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.config.fetch_strategy = strategy;
        self
    }

    /// Set the per-URL fetch deadline
    pub fn url_timeout(mut self, timeout: Duration) -> Self {
        self.config.url_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> BatchConfig {
        self.config
    }
}

impl BatchConfig {
    /// Create a new builder
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::new()
    }

    /// Whether a checkpoint is due after `completed` URLs
    pub fn checkpoint_due(&self, completed: usize) -> bool {
        self.checkpoint_every > 0 && completed > 0 && completed % self.checkpoint_every == 0
    }
}
