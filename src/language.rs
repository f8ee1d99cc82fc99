//! Language resolution
//!
//! Maps a declared language code (`<html lang>` or `Content-Language`) to a
//! display name. Region-qualified codes are looked up first, then the base
//! language; anything unrecognized is passed through untouched.

use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Display name returned for an absent or empty code
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

static LANGUAGES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // region-qualified
        ("pt-br", "Brazilian Portuguese"),
        ("pt-pt", "European Portuguese"),
        ("zh-cn", "Simplified Chinese"),
        ("zh-tw", "Traditional Chinese"),
        ("zh-hk", "Traditional Chinese"),
        ("en-us", "American English"),
        ("en-gb", "British English"),
        ("es-mx", "Mexican Spanish"),
        ("fr-ca", "Canadian French"),
        // base languages
        ("en", "English"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("it", "Italian"),
        ("pt", "Portuguese"),
        ("ru", "Russian"),
        ("ja", "Japanese"),
        ("ko", "Korean"),
        ("zh", "Chinese"),
        ("ar", "Arabic"),
        ("hi", "Hindi"),
        ("id", "Indonesian"),
        ("nl", "Dutch"),
        ("pl", "Polish"),
        ("tr", "Turkish"),
        ("vi", "Vietnamese"),
        ("th", "Thai"),
        ("sv", "Swedish"),
        ("da", "Danish"),
        ("fi", "Finnish"),
        ("no", "Norwegian"),
        ("cs", "Czech"),
        ("el", "Greek"),
        ("he", "Hebrew"),
        ("ro", "Romanian"),
        ("uk", "Ukrainian"),
        ("fa", "Persian"),
        ("hu", "Hungarian"),
        ("sk", "Slovak"),
        ("bn", "Bengali"),
    ])
});

static HTML_LANG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html[lang]").expect("valid selector"));

/// Resolve a language code to its display name.
///
/// Never fails: empty input yields [`UNKNOWN_LANGUAGE`] and unknown codes are
/// returned unchanged, surrounding whitespace included.
pub fn resolve(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return UNKNOWN_LANGUAGE.to_string();
    }

    let normalized = trimmed.to_lowercase().replace('_', "-");
    if let Some(name) = LANGUAGES.get(normalized.as_str()) {
        return (*name).to_string();
    }

    let base = normalized.split('-').next().unwrap_or_default();
    match LANGUAGES.get(base) {
        Some(name) => (*name).to_string(),
        None => code.to_string(),
    }
}

/// Read the declared language code of a page.
///
/// The document's `lang` attribute wins; otherwise the first entry of the
/// `content-language` response header is used. Header names are expected
/// lower-cased.
pub fn declared_language(document: &Html, headers: &HashMap<String, String>) -> Option<String> {
    document
        .select(&HTML_LANG)
        .next()
        .and_then(|html| html.value().attr("lang"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("content-language")
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_code_wins() {
        assert_eq!(resolve("pt-BR"), "Brazilian Portuguese");
        assert_eq!(resolve("zh-CN"), "Simplified Chinese");
        assert_eq!(resolve("pt_br"), "Brazilian Portuguese");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(resolve("EN"), "English");
        assert_eq!(resolve(" de "), "German");
    }

    #[test]
    fn test_region_falls_back_to_base() {
        assert_eq!(resolve("en-AU"), "English");
        assert_eq!(resolve("de-CH"), "German");
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(resolve(""), "Unknown");
        assert_eq!(resolve("   "), "Unknown");
        assert_eq!(resolve("xx"), "xx");
        assert_eq!(resolve("Xx-YY"), "Xx-YY");
        assert_eq!(resolve(" xx "), " xx ");
    }

    #[test]
    fn test_declared_language_prefers_document() {
        let document = Html::parse_document(r#"<html lang="fr"><body></body></html>"#);
        let headers = HashMap::from([("content-language".to_string(), "de".to_string())]);
        assert_eq!(declared_language(&document, &headers).as_deref(), Some("fr"));
    }

    #[test]
    fn test_declared_language_header_fallback() {
        let document = Html::parse_document("<html><body></body></html>");
        let headers = HashMap::from([(
            "content-language".to_string(),
            "es-MX, en".to_string(),
        )]);
        assert_eq!(
            declared_language(&document, &headers).as_deref(),
            Some("es-MX")
        );
        assert_eq!(declared_language(&document, &HashMap::new()), None);
    }
}
