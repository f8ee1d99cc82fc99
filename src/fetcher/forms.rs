//! Form field discovery
//!
//! Walks visible text-entry controls of a page that contains a form and
//! describes each one. Every piece of metadata comes from an independent
//! probe; a probe that finds nothing never affects the others.

use crate::extractor::normalize_whitespace;
use crate::fetcher::FieldDescriptor;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").expect("valid selector"));
static FIELDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form input, form textarea").expect("valid selector"));
static LABELS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("label").expect("valid selector"));
static WITH_ID: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[id]").expect("valid selector"));

const TEXT_ENTRY_TYPES: &[&str] = &[
    "text", "email", "tel", "url", "search", "number", "password", "date",
];

/// A single label lookup strategy
pub type LabelProbe = fn(&ElementRef<'_>, &Html) -> Option<String>;

/// Label probes in priority order; the first `Some` wins
pub const LABEL_PROBES: &[LabelProbe] = &[
    label_from_aria_labelledby,
    label_from_for_attribute,
    label_from_wrapping_label,
    label_from_preceding_sibling,
    label_from_aria_label,
];

/// Describe every visible text-entry control, in document order.
///
/// Returns an empty list when the page has no form.
pub fn collect_form_fields(document: &Html) -> Vec<FieldDescriptor> {
    if document.select(&FORM).next().is_none() {
        return Vec::new();
    }

    document
        .select(&FIELDS)
        .filter(is_visible_text_entry)
        .map(|field| describe(&field, document))
        .collect()
}

fn describe(field: &ElementRef<'_>, document: &Html) -> FieldDescriptor {
    FieldDescriptor {
        label: LABEL_PROBES.iter().find_map(|probe| probe(field, document)),
        placeholder: non_empty(field.value().attr("placeholder")),
        field_type: Some(field_type(field)),
    }
}

fn field_type(field: &ElementRef<'_>) -> String {
    if field.value().name() == "textarea" {
        return "textarea".to_string();
    }
    field
        .value()
        .attr("type")
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

fn is_visible_text_entry(field: &ElementRef<'_>) -> bool {
    let element = field.value();
    if element.attr("hidden").is_some() {
        return false;
    }
    let hidden_style = element
        .attr("style")
        .map(|style| style.replace(' ', "").to_lowercase())
        .is_some_and(|style| style.contains("display:none") || style.contains("visibility:hidden"));
    if hidden_style {
        return false;
    }
    element.name() == "textarea" || TEXT_ENTRY_TYPES.contains(&field_type(field).as_str())
}

fn element_text(element: &ElementRef<'_>) -> Option<String> {
    let text = normalize_whitespace(&element.text().collect::<String>());
    if text.is_empty() { None } else { Some(text) }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(normalize_whitespace)
        .filter(|value| !value.is_empty())
}

fn find_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .select(&WITH_ID)
        .find(|element| element.value().attr("id") == Some(id))
}

fn label_from_aria_labelledby(field: &ElementRef<'_>, document: &Html) -> Option<String> {
    let ids = field.value().attr("aria-labelledby")?;
    let parts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| find_by_id(document, id))
        .filter_map(|element| element_text(&element))
        .collect();
    if parts.is_empty() { None } else { Some(parts.join(" ")) }
}

fn label_from_for_attribute(field: &ElementRef<'_>, document: &Html) -> Option<String> {
    let id = field.value().attr("id")?;
    document
        .select(&LABELS)
        .filter(|label| label.value().attr("for") == Some(id))
        .find_map(|label| element_text(&label))
}

fn label_from_wrapping_label(field: &ElementRef<'_>, _document: &Html) -> Option<String> {
    field
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "label")
        .and_then(|label| element_text(&label))
}

fn label_from_preceding_sibling(field: &ElementRef<'_>, _document: &Html) -> Option<String> {
    field
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .filter(|sibling| sibling.value().name() == "label")
        .and_then(|label| element_text(&label))
}

fn label_from_aria_label(field: &ElementRef<'_>, _document: &Html) -> Option<String> {
    non_empty(field.value().attr("aria-label"))
}
