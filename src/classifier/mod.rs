//! # Technology Classifier Module
//!
//! Determines which platforms and technologies a site is built with by
//! combining four sources:
//!
//! - a declarative signature table evaluated against the markup
//! - the `X-Powered-By` response header
//! - keywords in external script sources
//! - an external [`TechnologyDetector`]
//!
//! Classification never fails. The merged result is deduplicated ignoring
//! case, sorted, and replaced by a single sentinel when nothing was found.

mod detector;
pub mod signatures;

pub use detector::{DetectError, Detection, HttpDetector, NoopDetector, TechnologyDetector, parse_detection};
pub use signatures::{AttrMatch, SIGNATURES, SCRIPT_KEYWORDS, Signature, SignatureMatcher, SignatureRule};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tracing::{debug, instrument, warn};

use crate::error::SiteError;

/// Reported when no source found anything
pub const NO_PLATFORM_DETECTED: &str = "No specific platform detected";

/// Merges signature, header, script and detector findings
#[derive(Clone)]
pub struct TechnologyClassifier {
    matcher: Arc<SignatureMatcher>,
    detector: Arc<dyn TechnologyDetector>,
    detector_timeout: Duration,
}

impl std::fmt::Debug for TechnologyClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TechnologyClassifier")
            .field("matcher", &self.matcher)
            .field("detector_timeout", &self.detector_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for TechnologyClassifier {
    fn default() -> Self {
        Self::new(Arc::new(NoopDetector))
    }
}

impl TechnologyClassifier {
    /// Create a classifier using the default signature table
    pub fn new(detector: Arc<dyn TechnologyDetector>) -> Self {
        Self {
            matcher: Arc::new(SignatureMatcher::default()),
            detector,
            detector_timeout: Duration::from_secs(30),
        }
    }

    /// Replace the signature matcher
    pub fn with_matcher(mut self, matcher: SignatureMatcher) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Bound how long the external detector may take
    pub fn with_detector_timeout(mut self, timeout: Duration) -> Self {
        self.detector_timeout = timeout;
        self
    }

    /// Findings that need only the markup and headers
    pub fn local_findings(&self, html: &str, headers: &HashMap<String, String>) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut findings: Vec<String> = self
            .matcher
            .platforms(&document)
            .into_iter()
            .map(str::to_string)
            .collect();

        if let Some(powered_by) = headers.get("x-powered-by") {
            findings.push(format!("Powered by: {}", powered_by.trim()));
        }

        findings.extend(
            signatures::script_frameworks(&document)
                .into_iter()
                .map(str::to_string),
        );
        findings
    }

    /// Classify a page. Detector failures degrade the result but never fail it.
    #[instrument(skip(self, html, headers))]
    pub async fn classify(&self, html: &str, headers: &HashMap<String, String>, url: &str) -> Vec<String> {
        let mut findings = self.local_findings(html, headers);

        match tokio::time::timeout(self.detector_timeout, self.detector.detect(url)).await {
            Ok(Ok(detection)) => findings.extend(
                detection
                    .into_iter()
                    .map(|(name, categories)| format_detection(&name, &categories)),
            ),
            Ok(Err(e)) => {
                let degraded = SiteError::ClassificationPartial(e.to_string());
                warn!("Detector error for {}: {}", url, degraded);
            }
            Err(_) => {
                let degraded = SiteError::ClassificationPartial(format!(
                    "detector timed out after {:?}",
                    self.detector_timeout
                ));
                warn!("Detector error for {}: {}", url, degraded);
            }
        }

        let findings = finalize(findings);
        debug!("Classified {} as {:?}", url, findings);
        findings
    }
}

/// `"name (cat1, cat2)"`, or the bare name when there are no categories
pub fn format_detection(name: &str, categories: &[String]) -> String {
    if categories.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, categories.join(", "))
    }
}

/// Deduplicate ignoring case, sort, and substitute the sentinel for nothing.
///
/// When two findings differ only in case, the one that sorts first is kept.
pub fn finalize(findings: Vec<String>) -> Vec<String> {
    let sorted: BTreeSet<String> = findings
        .into_iter()
        .map(|finding| finding.trim().to_string())
        .filter(|finding| !finding.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let unique: Vec<String> = sorted
        .into_iter()
        .filter(|finding| seen.insert(finding.to_lowercase()))
        .collect();

    if unique.is_empty() {
        vec![NO_PLATFORM_DETECTED.to_string()]
    } else {
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedDetector(Detection);

    #[async_trait]
    impl TechnologyDetector for FixedDetector {
        async fn detect(&self, _url: &str) -> Result<Detection, DetectError> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl TechnologyDetector for FailingDetector {
        async fn detect(&self, _url: &str) -> Result<Detection, DetectError> {
            Err(DetectError::Format("service unavailable".to_string()))
        }
    }

    struct SlowDetector;

    #[async_trait]
    impl TechnologyDetector for SlowDetector {
        async fn detect(&self, _url: &str) -> Result<Detection, DetectError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Detection::from([("Late".to_string(), vec![])]))
        }
    }

    const WORDPRESS: &str = r#"<html><head><meta name="generator" content="WordPress 6.0">
        <script src="https://code.jquery.com/jquery-3.7.0.min.js"></script></head><body></body></html>"#;

    #[tokio::test]
    async fn test_wordpress_generator() {
        let findings = TechnologyClassifier::default()
            .classify(WORDPRESS, &HashMap::new(), "https://example.com")
            .await;
        assert!(findings.contains(&"WordPress".to_string()));
        assert_eq!(findings, vec!["WordPress", "jQuery"]);
    }

    #[tokio::test]
    async fn test_empty_page_sentinel() {
        let findings = TechnologyClassifier::default()
            .classify("<html><body></body></html>", &HashMap::new(), "https://example.com")
            .await;
        assert_eq!(findings, vec![NO_PLATFORM_DETECTED]);
    }

    #[tokio::test]
    async fn test_merges_header_and_detector() {
        let detector = FixedDetector(Detection::from([
            ("React".to_string(), vec!["JavaScript frameworks".to_string()]),
            ("WordPress".to_string(), vec![]),
        ]));
        let headers = HashMap::from([("x-powered-by".to_string(), "PHP/8.2".to_string())]);

        let findings = TechnologyClassifier::new(Arc::new(detector))
            .classify(WORDPRESS, &headers, "https://example.com")
            .await;

        assert_eq!(
            findings,
            vec![
                "Powered by: PHP/8.2",
                "React (JavaScript frameworks)",
                "WordPress",
                "jQuery",
            ]
        );
    }

    #[tokio::test]
    async fn test_detector_failure_keeps_partial_results() {
        let findings = TechnologyClassifier::new(Arc::new(FailingDetector))
            .classify(WORDPRESS, &HashMap::new(), "https://example.com")
            .await;
        assert_eq!(findings, vec!["WordPress", "jQuery"]);
    }

    #[tokio::test]
    async fn test_detector_timeout_keeps_partial_results() {
        let findings = TechnologyClassifier::new(Arc::new(SlowDetector))
            .with_detector_timeout(Duration::from_millis(50))
            .classify(WORDPRESS, &HashMap::new(), "https://example.com")
            .await;
        assert_eq!(findings, vec!["WordPress", "jQuery"]);
    }

    #[tokio::test]
    async fn test_classification_is_idempotent() {
        let classifier = TechnologyClassifier::default();
        let first = classifier.classify(WORDPRESS, &HashMap::new(), "https://example.com").await;
        let second = classifier.classify(WORDPRESS, &HashMap::new(), "https://example.com").await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_finalize_case_insensitive_dedup() {
        let findings = finalize(vec![
            "jquery".to_string(),
            "jQuery".to_string(),
            "React".to_string(),
            "React".to_string(),
            " ".to_string(),
        ]);
        assert_eq!(findings, vec!["React", "jQuery"]);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            format_detection("Nginx", &["Web servers".to_string(), "Reverse proxies".to_string()]),
            "Nginx (Web servers, Reverse proxies)"
        );
        assert_eq!(format_detection("PHP", &[]), "PHP");
    }
}
