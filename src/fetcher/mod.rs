//! # Page Fetcher Module
//!
//! Retrieves the raw HTML of a site either with a lightweight static GET or
//! by rendering it in a headless browser. Network trouble is reported as
//! data: a failed fetch is a [`FetchResult`] with `status_code == 0` and no
//! HTML, never an error returned to the caller.
//!
//! ## Key Components
//!
//! - `PageFetcher`: Holds the shared HTTP client and fetch configuration
//! - `FetchMode`: Static request or headless render for a single fetch
//! - `FetchStrategy`: Per-batch policy combining the two modes
//! - `FetchResult` / `FieldDescriptor`: What a fetch hands to extraction

mod config;
mod error;
mod forms;
mod render;

pub use config::{DEFAULT_USER_AGENT, FetcherConfig, FetcherConfigBuilder};
pub use error::FetchError;
pub use forms::{LABEL_PROBES, LabelProbe, collect_form_fields};

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::SiteError;
use crate::extractor::{normalize_whitespace, visible_text};

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// How a single fetch retrieves the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Single HTTP GET
    Static,
    /// Headless browser render
    Dynamic,
}

/// Per-batch policy for choosing between static and dynamic fetching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Never launch a browser
    #[default]
    StaticOnly,
    /// Always render
    DynamicOnly,
    /// Render only when the static fetch fails or returns a script-only shell
    StaticThenDynamic,
}

impl FromStr for FetchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" | "static-only" => Ok(FetchStrategy::StaticOnly),
            "dynamic" | "dynamic-only" => Ok(FetchStrategy::DynamicOnly),
            "fallback" | "static-then-dynamic" => Ok(FetchStrategy::StaticThenDynamic),
            other => Err(format!("unknown fetch strategy: {other}")),
        }
    }
}

/// Metadata of a single text-entry control
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Associated label text
    pub label: Option<String>,

    /// Placeholder text
    pub placeholder: Option<String>,

    /// Input type (`text`, `email`, `textarea`, ...)
    #[serde(rename = "type")]
    pub field_type: Option<String>,
}

/// Result of fetching a page
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Raw HTML; absent when the fetch failed
    pub html: Option<String>,

    /// HTTP status code, `0` when no response was received
    pub status_code: u16,

    /// Response headers keyed by lower-cased name
    pub headers: HashMap<String, String>,

    /// Text-entry controls found in the page's forms
    pub form_fields: Vec<FieldDescriptor>,

    /// Whether the HTML came from a headless render
    pub rendered_dynamically: bool,

    /// Why the fetch failed, if it did
    pub failure: Option<SiteError>,
}

impl FetchResult {
    /// A failed fetch
    pub fn failed(failure: SiteError, rendered_dynamically: bool) -> Self {
        Self {
            html: None,
            status_code: 0,
            headers: HashMap::new(),
            form_fields: Vec::new(),
            rendered_dynamically,
            failure: Some(failure),
        }
    }

    /// Whether extraction should run on this result
    pub fn is_extractable(&self) -> bool {
        self.status_code == 200 && self.html.is_some()
    }
}

/// Fetches pages statically or through a headless browser
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl PageFetcher {
    /// Create a fetcher with the given configuration
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| FetchError::Config(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.static_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { client, config })
    }

    /// The configuration in use
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch a page with a single mode. Never fails.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str, mode: FetchMode) -> FetchResult {
        let rendered = mode == FetchMode::Dynamic;
        let result = match mode {
            FetchMode::Static => self.fetch_static(url).await,
            FetchMode::Dynamic => render::render_page(url, &self.config).await,
        };

        match result {
            Ok(result) => {
                debug!(status = result.status_code, rendered, "Fetched {}", url);
                result
            }
            Err(e) => {
                warn!("Fetch of {} failed ({:?}): {}", url, mode, e);
                FetchResult::failed(e.into_site_error(rendered), rendered)
            }
        }
    }

    /// Fetch a page following a batch-level strategy. Never fails.
    pub async fn fetch_with_strategy(&self, url: &str, strategy: FetchStrategy) -> FetchResult {
        match strategy {
            FetchStrategy::StaticOnly => self.fetch(url, FetchMode::Static).await,
            FetchStrategy::DynamicOnly => self.fetch(url, FetchMode::Dynamic).await,
            FetchStrategy::StaticThenDynamic => {
                let first = self.fetch(url, FetchMode::Static).await;
                if !self.needs_render(&first) {
                    return first;
                }

                debug!("Escalating {} to headless render", url);
                let rendered = self.fetch(url, FetchMode::Dynamic).await;
                if rendered.html.is_some() || first.html.is_none() {
                    rendered
                } else {
                    first
                }
            }
        }
    }

    /// Whether a static result is worth re-fetching with a browser
    pub fn needs_render(&self, result: &FetchResult) -> bool {
        match &result.html {
            None => true,
            Some(_) if result.status_code != 200 => true,
            Some(html) => {
                let document = Html::parse_document(html);
                visible_text_len(&document) < self.config.min_static_text_len
            }
        }
    }

    async fn fetch_static(&self, url: &str) -> Result<FetchResult, FetchError> {
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_lowercase(), value.to_string()))
            })
            .collect();
        let html = response.text().await?;

        let form_fields = {
            let document = Html::parse_document(&html);
            collect_form_fields(&document)
        };

        Ok(FetchResult {
            html: Some(html),
            status_code,
            headers,
            form_fields,
            rendered_dynamically: false,
            failure: None,
        })
    }
}

/// Characters of visible text in the body, ignoring scripts and styles
pub fn visible_text_len(document: &Html) -> usize {
    document
        .select(&BODY)
        .next()
        .map(|body| normalize_whitespace(&visible_text(&body)).chars().count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::time::Duration;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(
            FetcherConfig::builder()
                .static_timeout(Duration::from_secs(2))
                .min_static_text_len(20)
                .build(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_static_fetch_success() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_header("X-Powered-By", "Express")
            .with_body(r#"<html><body><form><label for="e">Email</label><input id="e" type="email"></form></body></html>"#)
            .expect(1)
            .create_async()
            .await;

        let result = fetcher().fetch(&server.url(), FetchMode::Static).await;

        assert_eq!(result.status_code, 200);
        assert!(result.is_extractable());
        assert!(!result.rendered_dynamically);
        assert_eq!(result.headers.get("x-powered-by").map(String::as_str), Some("Express"));
        assert_eq!(result.form_fields.len(), 1);
        assert_eq!(result.form_fields[0].label.as_deref(), Some("Email"));
        assert!(result.failure.is_none());

        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_is_returned_not_extractable() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let result = fetcher()
            .fetch(&format!("{}/missing", server.url()), FetchMode::Static)
            .await;

        assert_eq!(result.status_code, 404);
        assert!(result.html.is_some());
        assert!(!result.is_extractable());
    }

    #[tokio::test]
    async fn test_unreachable_is_data() {
        let result = fetcher()
            .fetch("http://127.0.0.1:1/", FetchMode::Static)
            .await;

        assert_eq!(result.status_code, 0);
        assert!(result.html.is_none());
        assert!(matches!(result.failure, Some(SiteError::NetworkFailure(_))));
    }

    #[test]
    fn test_needs_render() {
        let fetcher = fetcher();
        let shell = FetchResult {
            html: Some(r#"<html><body><div id="root"></div><script>var app = "a long script body that is not text";</script></body></html>"#.to_string()),
            status_code: 200,
            ..Default::default()
        };
        let content = FetchResult {
            html: Some("<html><body><p>Plenty of visible words in this paragraph.</p></body></html>".to_string()),
            status_code: 200,
            ..Default::default()
        };

        assert!(fetcher.needs_render(&shell));
        assert!(!fetcher.needs_render(&content));
        assert!(fetcher.needs_render(&FetchResult::failed(
            SiteError::NetworkFailure("refused".into()),
            false
        )));
    }

    fn fetcher_without_browser() -> PageFetcher {
        PageFetcher::new(
            FetcherConfig::builder()
                .static_timeout(Duration::from_secs(2))
                .render_timeout(Duration::from_secs(5))
                .browser_executable("/nonexistent/chromium")
                .build(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_render_keeps_static_page() {
        let mut server = Server::new_async().await;
        let shell = r#"<html><body><div id="root"></div><script>boot()</script></body></html>"#;
        let _m = server
            .mock("GET", "/app")
            .with_status(200)
            .with_body(shell)
            .create_async()
            .await;

        let fetcher = fetcher_without_browser();
        let url = format!("{}/app", server.url());
        let static_result = fetcher.fetch(&url, FetchMode::Static).await;
        assert!(fetcher.needs_render(&static_result));

        let result = fetcher
            .fetch_with_strategy(&url, FetchStrategy::StaticThenDynamic)
            .await;
        assert_eq!(result.status_code, 200);
        assert_eq!(result.html.as_deref(), Some(shell));
        assert!(!result.rendered_dynamically);
        assert!(result.failure.is_none());
    }

    #[tokio::test]
    async fn test_failed_render_after_unreachable_static() {
        let result = fetcher_without_browser()
            .fetch_with_strategy("http://127.0.0.1:1/", FetchStrategy::StaticThenDynamic)
            .await;

        assert_eq!(result.status_code, 0);
        assert!(result.html.is_none());
        assert!(result.rendered_dynamically);
        assert!(matches!(result.failure, Some(SiteError::RenderFailure(_))));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("static".parse::<FetchStrategy>(), Ok(FetchStrategy::StaticOnly));
        assert_eq!("Dynamic".parse::<FetchStrategy>(), Ok(FetchStrategy::DynamicOnly));
        assert_eq!(
            "static-then-dynamic".parse::<FetchStrategy>(),
            Ok(FetchStrategy::StaticThenDynamic)
        );
        assert!("sometimes".parse::<FetchStrategy>().is_err());
    }
}
