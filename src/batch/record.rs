//! Per-URL states and the records the batch produces

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::language::UNKNOWN_LANGUAGE;

/// Lifecycle of a single URL inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Pending,
    Fetching,
    Extracting,
    Enriching,
    Done,
    Failed,
}

impl UrlState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UrlState::Done | UrlState::Failed)
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UrlState::Pending => "pending",
            UrlState::Fetching => "fetching",
            UrlState::Extracting => "extracting",
            UrlState::Enriching => "enriching",
            UrlState::Done => "done",
            UrlState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// HTTP status of a site, or `Error` when processing itself broke.
///
/// Serialized as the bare status code or the string `"Error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Code(u16),
    Error,
}

impl Serialize for SiteStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SiteStatus::Code(code) => serializer.serialize_u16(*code),
            SiteStatus::Error => serializer.serialize_str("Error"),
        }
    }
}

impl<'de> Deserialize<'de> for SiteStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(SiteStatus::Code(code)),
            Raw::Text(text) if text == "Error" => Ok(SiteStatus::Error),
            Raw::Text(text) => Err(de::Error::custom(format!("invalid site status: {text}"))),
        }
    }
}

/// Enrichment for one unique URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub url: String,

    pub summary: String,

    pub language: String,

    #[serde(rename = "status_code")]
    pub status: SiteStatus,

    pub platforms: Vec<String>,
}

impl AnalysisRecord {
    /// The site could not be fetched
    pub fn fetch_failed(url: impl Into<String>) -> Self {
        Self::placeholder(url, "Error fetching", SiteStatus::Code(0), "Error detecting")
    }

    /// The fetch deadline elapsed before the site answered
    pub fn timed_out(url: impl Into<String>) -> Self {
        Self::placeholder(url, "Error fetching: timed out", SiteStatus::Code(0), "Error detecting")
    }

    /// Processing broke for a reason unrelated to the site
    pub fn unknown(url: impl Into<String>) -> Self {
        Self::placeholder(url, "Error processing", SiteStatus::Error, "Error")
    }

    /// The site answered, but not with 200; nothing is extracted
    pub fn not_ok(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            summary: String::new(),
            language: String::new(),
            status: SiteStatus::Code(status_code),
            platforms: Vec::new(),
        }
    }

    fn placeholder(url: impl Into<String>, summary: &str, status: SiteStatus, platform: &str) -> Self {
        Self {
            url: url.into(),
            summary: summary.to_string(),
            language: UNKNOWN_LANGUAGE.to_string(),
            status,
            platforms: vec![platform.to_string()],
        }
    }

    /// Whether this record carries an error placeholder
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SiteStatus::Code(0) | SiteStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(SiteStatus::Code(200)).unwrap(), json!(200));
        assert_eq!(serde_json::to_value(SiteStatus::Error).unwrap(), json!("Error"));

        let status: SiteStatus = serde_json::from_value(json!("Error")).unwrap();
        assert_eq!(status, SiteStatus::Error);
        let status: SiteStatus = serde_json::from_value(json!(404)).unwrap();
        assert_eq!(status, SiteStatus::Code(404));
        assert!(serde_json::from_value::<SiteStatus>(json!("Teapot")).is_err());
    }

    #[test]
    fn test_placeholders() {
        let record = AnalysisRecord::fetch_failed("https://down.example");
        assert_eq!(record.summary, "Error fetching");
        assert_eq!(record.language, "Unknown");
        assert_eq!(record.status, SiteStatus::Code(0));
        assert_eq!(record.platforms, vec!["Error detecting"]);
        assert!(record.is_failure());

        let record = AnalysisRecord::unknown("https://broken.example");
        assert_eq!(record.status, SiteStatus::Error);
        assert_eq!(record.platforms, vec!["Error"]);

        let record = AnalysisRecord::not_ok("https://gone.example", 404);
        assert!(!record.is_failure());
        assert!(record.summary.is_empty() && record.platforms.is_empty());
    }

    #[test]
    fn test_record_json_shape() {
        let value = serde_json::to_value(AnalysisRecord::fetch_failed("https://a.example")).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "https://a.example",
                "summary": "Error fetching",
                "language": "Unknown",
                "status_code": 0,
                "platforms": ["Error detecting"]
            })
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(UrlState::Done.is_terminal());
        assert!(UrlState::Failed.is_terminal());
        assert!(!UrlState::Enriching.is_terminal());
        assert_eq!(UrlState::Extracting.to_string(), "extracting");
    }
}
