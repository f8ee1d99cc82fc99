//! External technology detection
//!
//! The detector is an unreliable collaborator: it is asked for the
//! technologies behind a URL and may time out, fail or answer garbage. The
//! classifier treats every error as a degraded result.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::error::Error as CrateError;

/// Technology name mapped to its categories
pub type Detection = HashMap<String, Vec<String>>;

/// Error type for detector operations
#[derive(Debug, Error)]
pub enum DetectError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Detector answered with a non-success status
    #[error("detector returned status {0}")]
    Status(u16),

    /// Detector answered with an unexpected payload
    #[error("unexpected detector response: {0}")]
    Format(String),

    /// Invalid endpoint or target URL
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<DetectError> for CrateError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Http(e) => CrateError::Http(e),
            _ => CrateError::Detect(err.to_string()),
        }
    }
}

/// Fingerprints the technologies a site uses
#[async_trait]
pub trait TechnologyDetector: Send + Sync {
    async fn detect(&self, url: &str) -> Result<Detection, DetectError>;
}

/// Detector that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDetector;

#[async_trait]
impl TechnologyDetector for NoopDetector {
    async fn detect(&self, _url: &str) -> Result<Detection, DetectError> {
        Ok(Detection::new())
    }
}

/// Detector backed by a Wappalyzer-compatible HTTP service.
///
/// Issues `GET <endpoint>?url=<target>` and accepts either an object mapping
/// technology names to category lists, or a list (optionally wrapped in a
/// `technologies` field) of `{ "name", "categories" }` entries whose
/// categories are strings or `{ "name" }` objects.
#[derive(Debug, Clone)]
pub struct HttpDetector {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDetector {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, DetectError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }
}

#[async_trait]
impl TechnologyDetector for HttpDetector {
    #[instrument(skip(self))]
    async fn detect(&self, url: &str) -> Result<Detection, DetectError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("url", url)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        let detection = parse_detection(&body)?;
        debug!("Detector found {} technologies for {}", detection.len(), url);
        Ok(detection)
    }
}

/// Normalise the accepted detector payload shapes
pub fn parse_detection(body: &Value) -> Result<Detection, DetectError> {
    match body {
        Value::Array(entries) => entries.iter().map(parse_entry).collect(),
        Value::Object(object) => {
            if let Some(Value::Array(entries)) = object.get("technologies") {
                return entries.iter().map(parse_entry).collect();
            }
            object
                .iter()
                .map(|(name, categories)| Ok((name.clone(), category_names(categories)?)))
                .collect()
        }
        other => Err(DetectError::Format(format!("expected object or array, got {other}"))),
    }
}

fn parse_entry(entry: &Value) -> Result<(String, Vec<String>), DetectError> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| DetectError::Format(format!("entry without name: {entry}")))?;
    let categories = match entry.get("categories") {
        Some(categories) => category_names(categories)?,
        None => Vec::new(),
    };
    Ok((name.to_string(), categories))
}

fn category_names(categories: &Value) -> Result<Vec<String>, DetectError> {
    let Value::Array(items) = categories else {
        return Err(DetectError::Format(format!("categories must be a list: {categories}")));
    };
    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(object) => object.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    #[test]
    fn test_parse_object_map() {
        let detection = parse_detection(&json!({
            "React": ["JavaScript frameworks"],
            "Nginx": ["Web servers", "Reverse proxies"]
        }))
        .unwrap();
        assert_eq!(detection["React"], vec!["JavaScript frameworks"]);
        assert_eq!(detection["Nginx"], vec!["Web servers", "Reverse proxies"]);
    }

    #[test]
    fn test_parse_entry_list() {
        let detection = parse_detection(&json!({
            "technologies": [
                {"name": "WordPress", "categories": [{"id": 1, "name": "CMS"}, {"id": 11, "name": "Blogs"}]},
                {"name": "PHP"}
            ]
        }))
        .unwrap();
        assert_eq!(detection["WordPress"], vec!["CMS", "Blogs"]);
        assert!(detection["PHP"].is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_detection(&json!("nope")).is_err());
        assert!(parse_detection(&json!([{"categories": []}])).is_err());
        assert!(parse_detection(&json!({"React": "frameworks"})).is_err());
    }

    #[tokio::test]
    async fn test_http_detector() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/detect")
            .match_query(mockito::Matcher::UrlEncoded(
                "url".into(),
                "https://example.com".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Vue.js": ["JavaScript frameworks"]}"#)
            .expect(1)
            .create_async()
            .await;

        let detector =
            HttpDetector::new(&format!("{}/detect", server.url()), Duration::from_secs(2)).unwrap();
        let detection = detector.detect("https://example.com").await.unwrap();

        assert_eq!(detection["Vue.js"], vec!["JavaScript frameworks"]);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_detector_error_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/detect")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let detector =
            HttpDetector::new(&format!("{}/detect", server.url()), Duration::from_secs(2)).unwrap();
        let err = detector.detect("https://example.com").await.unwrap_err();
        assert!(matches!(err, DetectError::Status(503)));
    }
}
