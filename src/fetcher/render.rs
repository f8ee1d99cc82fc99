//! Headless rendering with chromiumoxide
//!
//! Every render owns a dedicated browser process with its own temporary
//! profile. The session is closed explicitly on every path out of
//! [`render_page`]; `Drop` is the backstop that still stops the CDP handler
//! and removes the profile directory if a future is cancelled mid-render.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use scraper::Html;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::config::FetcherConfig;
use super::error::FetchError;
use super::forms::collect_form_fields;
use super::FetchResult;

/// Landmarks that signal the primary content has been rendered
const LANDMARK_SELECTOR: &str = "main, article, [role='main'], #content, .content";

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A browser process scoped to a single render
pub(crate) struct RenderSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: Option<PathBuf>,
}

impl RenderSession {
    /// Launch an isolated browser
    pub(crate) async fn launch(config: &FetcherConfig) -> Result<Self, FetchError> {
        let profile_dir = std::env::temp_dir().join(format!(
            "sitelens_chrome_{}_{}",
            std::process::id(),
            SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&profile_dir)?;

        let browser_config = match browser_config(config, &profile_dir) {
            Ok(browser_config) => browser_config,
            Err(e) => {
                remove_profile(&profile_dir);
                return Err(e);
            }
        };

        let (browser, mut handler) = match Browser::launch(browser_config).await {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile(&profile_dir);
                return Err(FetchError::Browser(format!("failed to launch browser: {e}")));
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            profile_dir: Some(profile_dir),
        })
    }

    /// Shut the browser down and remove its profile
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
        self.handler.abort();
        if let Some(path) = self.profile_dir.take() {
            remove_profile(&path);
        }
    }

    async fn open(&self, url: &str, config: &FetcherConfig) -> Result<FetchResult, FetchError> {
        let page = self.browser.new_page(url).await?;

        let (status_code, headers) = match page.wait_for_navigation_response().await {
            Ok(Some(request)) => match request.response.as_ref() {
                Some(response) => (
                    u16::try_from(response.status).unwrap_or(0),
                    header_map(response.headers.inner()),
                ),
                None => (200, HashMap::new()),
            },
            Ok(None) => (200, HashMap::new()),
            Err(e) => {
                debug!("No navigation response for {}: {}", url, e);
                (200, HashMap::new())
            }
        };

        if !wait_for_landmark(&page, config.landmark_wait).await {
            debug!("No content landmark on {} after {:?}", url, config.landmark_wait);
        }

        let html = page.content().await?;
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }

        let form_fields = {
            let document = Html::parse_document(&html);
            collect_form_fields(&document)
        };

        Ok(FetchResult {
            html: Some(html),
            status_code,
            headers,
            form_fields,
            rendered_dynamically: true,
            failure: None,
        })
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.handler.abort();
        if let Some(path) = self.profile_dir.take() {
            warn!("Render session dropped without close: {}", path.display());
            remove_profile(&path);
        }
    }
}

/// Render a page in a fresh headless browser and capture its final HTML
#[instrument(skip(config))]
pub(crate) async fn render_page(url: &str, config: &FetcherConfig) -> Result<FetchResult, FetchError> {
    let session = RenderSession::launch(config).await?;

    let result = match tokio::time::timeout(config.render_timeout, session.open(url, config)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(config.render_timeout.as_millis())),
    };

    session.close().await;
    if result.is_ok() {
        info!("Rendered {}", url);
    }
    result
}

fn browser_config(config: &FetcherConfig, profile_dir: &Path) -> Result<BrowserConfig, FetchError> {
    let mut builder = BrowserConfig::builder()
        .request_timeout(config.render_timeout)
        .window_size(1920, 1080)
        .user_data_dir(profile_dir)
        .arg(format!("--user-agent={}", config.user_agent))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-extensions")
        .arg("--disable-notifications")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio");

    if !config.headless {
        builder = builder.with_head();
    }
    if config.accept_invalid_certs {
        builder = builder.arg("--ignore-certificate-errors");
    }
    if let Some(path) = &config.browser_executable {
        builder = builder.chrome_executable(path);
    }
    if should_disable_sandbox() {
        builder = builder.no_sandbox();
    }

    builder.build().map_err(FetchError::Browser)
}

/// Poll for a content landmark with exponential backoff; absence is not an error
async fn wait_for_landmark(page: &Page, timeout: Duration) -> bool {
    let start = Instant::now();
    let mut poll_interval = Duration::from_millis(100);
    let max_interval = Duration::from_secs(1);

    loop {
        if page.find_element(LANDMARK_SELECTOR).await.is_ok() {
            return true;
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return false;
        }
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        poll_interval = (poll_interval * 2).min(max_interval);
    }
}

fn header_map(raw: &serde_json::Value) -> HashMap<String, String> {
    raw.as_object()
        .map(|object| {
            object
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .as_str()
                        .map(|value| (name.to_lowercase(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn remove_profile(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!("Failed to clean up browser profile {}: {}", path.display(), e);
    }
}

/// Containers cannot use the setuid sandbox
fn should_disable_sandbox() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var("container").is_ok()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_map_lowercases_names() {
        let headers = header_map(&json!({
            "X-Powered-By": "PHP/8.1",
            "Content-Language": "en",
            "X-Count": 3
        }));
        assert_eq!(headers.get("x-powered-by").map(String::as_str), Some("PHP/8.1"));
        assert_eq!(headers.get("content-language").map(String::as_str), Some("en"));
        assert!(!headers.contains_key("x-count"));
    }

    #[test]
    fn test_header_map_non_object() {
        assert!(header_map(&json!(null)).is_empty());
    }

    #[test]
    fn test_browser_config_builds_with_explicit_executable() {
        let config = FetcherConfig::builder()
            .browser_executable("/usr/bin/chromium")
            .build();
        let dir = tempfile::tempdir().unwrap();
        assert!(browser_config(&config, dir.path()).is_ok());
    }
}
