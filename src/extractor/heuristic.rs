//! Heuristic text extraction
//!
//! Used when readability produces too little text. Collects the title,
//! the first heading, descriptive meta tags and then every paragraph-like
//! block outside navigation chrome and advertising regions.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::ad_filter::AdFilter;
use super::{ensure_terminal_punctuation, normalize_whitespace, visible_text};

/// Blocks shorter than this are treated as chrome (buttons, captions, labels)
const MIN_BLOCK_CHARS: usize = 30;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, li, blockquote, h2, h3, h4, dd, figcaption, pre, td")
        .expect("valid selector")
});
static META: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "meta[name='description']",
        "meta[property='og:description']",
        "meta[name='twitter:description']",
        "meta[name='keywords']",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

/// Ordered, verbatim-deduplicated text parts
#[derive(Default)]
struct Parts {
    parts: Vec<String>,
    seen: HashSet<String>,
}

impl Parts {
    fn push(&mut self, text: String) {
        if !text.is_empty() && self.seen.insert(text.clone()) {
            self.parts.push(text);
        }
    }

    fn join(self) -> String {
        normalize_whitespace(&self.parts.join(" "))
    }
}

/// Extract text from a parsed document using the heuristic walk
pub(crate) fn extract_text(document: &Html, filter: &AdFilter) -> String {
    let mut parts = Parts::default();

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| normalize_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();
    if !title.is_empty() {
        parts.push(ensure_terminal_punctuation(&title));
    }

    if let Some(h1) = document.select(&H1).next() {
        let heading = normalize_whitespace(&visible_text(&h1));
        if !heading.is_empty() && !heading.eq_ignore_ascii_case(&title) {
            parts.push(ensure_terminal_punctuation(&heading));
        }
    }

    for selector in META.iter() {
        let content = document
            .select(selector)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(normalize_whitespace)
            .unwrap_or_default();
        if !content.is_empty() {
            parts.push(ensure_terminal_punctuation(&content));
        }
    }

    for block in document.select(&BLOCKS) {
        if has_nested_block(&block) || in_chrome(&block) || filter.is_excluded(&block) {
            continue;
        }
        let text = normalize_whitespace(&visible_text(&block));
        if text.chars().count() > MIN_BLOCK_CHARS {
            parts.push(text);
        }
    }

    parts.join()
}

// Only the innermost blocks are read, so `li > p` and friends count once
fn has_nested_block(block: &ElementRef<'_>) -> bool {
    block
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|el| BLOCKS.matches(&el))
}

/// Whether the nearest landmark around `element` is navigation, header or footer
fn in_chrome(element: &ElementRef<'_>) -> bool {
    for ancestor in element.ancestors().filter_map(ElementRef::wrap) {
        let el = ancestor.value();
        match (el.name(), el.attr("role")) {
            ("nav" | "header" | "footer", _) => return true,
            (_, Some("navigation" | "banner" | "contentinfo")) => return true,
            ("main" | "article", _) => return false,
            (_, Some("main" | "article")) => return false,
            _ => {}
        }
    }
    false
}
