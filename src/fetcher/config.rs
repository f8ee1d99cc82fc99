//! # Fetcher Configuration Module
//!
//! Configuration for the page fetcher: timeouts for the static request and
//! the headless render, the User-Agent both paths present, and how the
//! browser is launched.
//!
//! ## Key Components
//!
//! - `FetcherConfig`: The configuration struct with fetch parameters
//! - `FetcherConfigBuilder`: Builder pattern implementation for easier configuration

use std::path::PathBuf;
use std::time::Duration;

/// Browser-like User-Agent sent by the static fetch and the headless render
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for the page fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User agent to use for requests
    pub user_agent: String,

    /// Timeout for the static GET request
    pub static_timeout: Duration,

    /// Timeout for headless navigation
    pub render_timeout: Duration,

    /// How long to wait for a main/article/content landmark after DOM-ready
    pub landmark_wait: Duration,

    /// Whether to accept invalid TLS certificates
    pub accept_invalid_certs: bool,

    /// Explicit Chrome/Chromium executable; detected automatically when `None`
    pub browser_executable: Option<PathBuf>,

    /// Whether to run the browser headless
    pub headless: bool,

    /// Static pages with less visible text than this are re-rendered under
    /// `FetchStrategy::StaticThenDynamic`
    pub min_static_text_len: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            static_timeout: Duration::from_secs(10),
            render_timeout: Duration::from_secs(15),
            landmark_wait: Duration::from_secs(5),
            accept_invalid_certs: true,
            browser_executable: std::env::var_os("CHROMIUM_PATH").map(PathBuf::from),
            headless: true,
            min_static_text_len: 200,
        }
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the static request timeout
    pub fn static_timeout(mut self, timeout: Duration) -> Self {
        self.config.static_timeout = timeout;
        self
    }

    /// Set the headless navigation timeout
    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout = timeout;
        self
    }

    /// Set the landmark wait
    pub fn landmark_wait(mut self, wait: Duration) -> Self {
        self.config.landmark_wait = wait;
        self
    }

    /// Set whether invalid certificates are accepted
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    /// Set the browser executable
    pub fn browser_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.browser_executable = Some(path.into());
        self
    }

    /// Set whether the browser runs headless
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the visible-text threshold below which a static page is re-rendered
    pub fn min_static_text_len(mut self, len: usize) -> Self {
        self.config.min_static_text_len = len;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }
}
