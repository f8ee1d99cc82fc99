//! # Content Extraction Module
//!
//! Converts raw HTML into the canonical text of a page. Extraction is
//! layered and never fails:
//!
//! 1. Mozilla's readability algorithm; adequate when it yields more than
//!    100 characters.
//! 2. A heuristic walk over title, headings, meta descriptions and
//!    paragraph-like blocks, skipping navigation chrome and ad regions.
//!
//! Output text is whitespace-normalized but keeps punctuation, which the
//! summarizer relies on for sentence splitting.

pub mod ad_filter;
mod heuristic;

pub use ad_filter::{AD_RULES, AdFilter, AdRule, RuleField};

use std::io::Cursor;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::fetcher::FieldDescriptor;

/// Readability output must be longer than this to be used
const MIN_READABILITY_CHARS: usize = 100;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property='og:title']").expect("valid selector"));

/// Which extraction pass produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    Readability,
    Heuristic,
    Empty,
}

/// Text extracted from a page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Whitespace-normalized main text
    pub text: String,

    /// Page title
    pub title: Option<String>,

    /// The pass that produced `text`
    pub method: ExtractionMethod,
}

impl ExtractedContent {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Layered content extractor
#[derive(Debug, Default)]
pub struct ContentExtractor {
    filter: AdFilter,
}

impl ContentExtractor {
    /// Create an extractor with the default ad rule table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom ad filter
    pub fn with_filter(filter: AdFilter) -> Self {
        Self { filter }
    }

    /// Extract the main text of a page.
    ///
    /// `url` is the page address, used by readability to resolve relative
    /// links. Form fields, when present, are appended as a closing sentence.
    #[instrument(skip(self, html, form_fields), fields(url = %url))]
    pub fn extract(&self, html: &str, url: &Url, form_fields: &[FieldDescriptor]) -> ExtractedContent {
        let document = Html::parse_document(html);
        let title = page_title(&document);

        let (mut text, mut method) = match readability_text(html, url) {
            Some(text) if text.chars().count() > MIN_READABILITY_CHARS => {
                (text, ExtractionMethod::Readability)
            }
            _ => (
                heuristic::extract_text(&document, &self.filter),
                ExtractionMethod::Heuristic,
            ),
        };

        if text.is_empty() {
            method = ExtractionMethod::Empty;
        }

        if let Some(context) = form_context(form_fields) {
            text = if text.is_empty() { context } else { format!("{text} {context}") };
        }

        debug!(?method, chars = text.len(), "Extracted content");
        ExtractedContent { text, title, method }
    }
}

// `product.text` concatenates text nodes without separators, so the cleaned
// markup is walked instead to keep adjacent blocks apart.
fn readability_text(html: &str, url: &Url) -> Option<String> {
    let mut cursor = Cursor::new(html.as_bytes());
    match readability::extractor::extract(&mut cursor, url) {
        Ok(product) => {
            let fragment = Html::parse_fragment(&product.content);
            Some(normalize_whitespace(&visible_text(&fragment.root_element())))
        }
        Err(e) => {
            debug!("Readability failed: {}", e);
            None
        }
    }
}

fn page_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE)
        .next()
        .map(|title| normalize_whitespace(&title.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .or_else(|| {
            document
                .select(&OG_TITLE)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .map(normalize_whitespace)
                .filter(|title| !title.is_empty())
        })
}

/// Sentence describing what the page's form asks for
pub fn form_context(fields: &[FieldDescriptor]) -> Option<String> {
    let described: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            let name = field.label.as_deref().or(field.placeholder.as_deref())?;
            Some(match field.field_type.as_deref() {
                Some(kind) if kind != "text" => format!("{name} ({kind})"),
                _ => name.to_string(),
            })
        })
        .collect();

    if described.is_empty() {
        None
    } else {
        Some(format!("Form fields: {}.", described.join(", ")))
    }
}

/// Collapse every run of whitespace to a single space and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append a period unless the text already ends in terminal punctuation
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Text of an element, skipping script, style and template content
pub fn visible_text(element: &ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
            });
            if !hidden {
                out.push_str(text);
                out.push(' ');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/contact").unwrap()
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\tb   c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_ensure_terminal_punctuation() {
        assert_eq!(ensure_terminal_punctuation("Hello"), "Hello.");
        assert_eq!(ensure_terminal_punctuation("Hello!"), "Hello!");
        assert_eq!(ensure_terminal_punctuation("Really? "), "Really?");
        assert_eq!(ensure_terminal_punctuation(""), "");
    }

    #[test]
    fn test_form_context() {
        let fields = vec![
            FieldDescriptor {
                label: Some("Name".into()),
                placeholder: None,
                field_type: Some("text".into()),
            },
            FieldDescriptor {
                label: None,
                placeholder: Some("you@example.com".into()),
                field_type: Some("email".into()),
            },
            FieldDescriptor::default(),
        ];
        assert_eq!(
            form_context(&fields).as_deref(),
            Some("Form fields: Name, you@example.com (email).")
        );
        assert_eq!(form_context(&[]), None);
    }

    #[test]
    fn test_empty_page() {
        let content = ContentExtractor::new().extract("", &url(), &[]);
        assert!(content.is_empty());
        assert_eq!(content.method, ExtractionMethod::Empty);
        assert_eq!(content.title, None);
    }

    #[test]
    fn test_short_page_uses_heuristic() {
        let html = r#"<html><head><title>Contact us</title>
            <meta name="description" content="Send the team a message"></head>
            <body><p>We answer every message within two working days.</p></body></html>"#;
        let content = ContentExtractor::new().extract(html, &url(), &[]);

        assert_eq!(content.method, ExtractionMethod::Heuristic);
        assert_eq!(content.title.as_deref(), Some("Contact us"));
        assert!(content.text.starts_with("Contact us."));
        assert!(content.text.contains("Send the team a message."));
        assert!(content.text.contains("We answer every message within two working days."));
    }

    #[test]
    fn test_article_page_uses_readability() {
        let paragraph = "The volunteer program pairs every new member with a mentor who has at least two years of experience in the field, and together they plan a first project.";
        let html = format!(
            r#"<html><head><title>Volunteer</title></head><body>
                <nav><a href="/">Home</a><a href="/about">About</a></nav>
                <article><h1>Join the volunteer program</h1>
                <p>{paragraph}</p><p>{paragraph} Applications are reviewed weekly.</p></article>
            </body></html>"#
        );
        let content = ContentExtractor::new().extract(&html, &url(), &[]);

        assert_eq!(content.method, ExtractionMethod::Readability);
        assert!(content.text.contains("mentor"));
        assert!(!content.text.contains('\n'));
    }

    #[test]
    fn test_readability_keeps_block_boundaries() {
        let paragraph = "The volunteer program pairs every new member with a mentor who has at least two years of experience.";
        let html = format!(
            r#"<html><head><title>Volunteer</title></head><body>
                <article><h2>Benefits</h2><p>{paragraph}</p>
                <ul><li>Weekly shifts</li><li>Free training</li></ul>
                <p>{paragraph} Applications are reviewed weekly.</p></article>
            </body></html>"#
        );
        let content = ContentExtractor::new().extract(&html, &url(), &[]);

        assert_eq!(content.method, ExtractionMethod::Readability);
        assert!(!content.text.contains("experience.Weekly"));
        assert!(!content.text.contains("shiftsFree"));
        assert!(!content.text.contains("trainingThe"));
        assert!(content.text.contains("Weekly shifts Free training"));
    }

    #[test]
    fn test_form_fields_appended() {
        let fields = vec![FieldDescriptor {
            label: Some("Email".into()),
            placeholder: None,
            field_type: Some("email".into()),
        }];
        let content = ContentExtractor::new().extract("<html><body></body></html>", &url(), &fields);
        assert_eq!(content.text, "Form fields: Email (email).");
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let document = Html::parse_fragment("<div>Hello <script>evil()</script><span>world</span></div>");
        let div = document.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(normalize_whitespace(&visible_text(&div)), "Hello world");
    }
}
