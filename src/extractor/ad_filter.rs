//! Advertising and irrelevant-region filter
//!
//! Rule data lives in [`AD_RULES`]; [`AdFilter`] compiles and evaluates it.
//! Attribute rules apply to an element and its ancestors. Structural rules
//! (embedded frames, subscribe forms) apply to the element and its direct
//! parent only, so one iframe on the page does not blank every block.
//! Neither kind looks at page roots (`body`, `html`, `main`, `article`).

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::warn;

static EMBEDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe, ins").expect("valid selector"));
static FORMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").expect("valid selector"));
static FORM_CONTROLS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input[type='submit'], input[type='button'], input[placeholder], button")
        .expect("valid selector")
});
static SUBSCRIBE_CTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(subscribe|newsletter|sign\s?up for|join our (mailing )?list|get (our )?updates)\b")
        .expect("valid regex")
});

/// Which attribute a rule is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Class,
    Id,
    ClassOrId,
}

/// A single attribute rule
#[derive(Debug, Clone, Copy)]
pub struct AdRule {
    /// Pattern family, for diagnostics
    pub family: &'static str,
    pub field: RuleField,
    pub pattern: &'static str,
}

/// Default rule table
pub const AD_RULES: &[AdRule] = &[
    AdRule {
        family: "advertising",
        field: RuleField::ClassOrId,
        pattern: r"(?i)(^|[-_\s])(ad|ads|advert|adverts|advertisement|advertising|adsbygoogle|adslot|adunit|sponsor|sponsored|dfp|doubleclick|promo)([-_\s]|$)",
    },
    AdRule {
        family: "tracking",
        field: RuleField::ClassOrId,
        pattern: r"(?i)(^|[-_\s])(tracking|tracker|analytics|pixel|beacon)([-_\s]|$)",
    },
    AdRule {
        family: "newsletter",
        field: RuleField::ClassOrId,
        pattern: r"(?i)(^|[-_\s])(newsletter|subscribe|subscription|mailchimp|mc4wp)([-_\s]|$)",
    },
    AdRule {
        family: "social",
        field: RuleField::ClassOrId,
        pattern: r"(?i)(^|[-_\s])(social|share|sharing|follow-us|addthis|sharethis|fb-like)([-_\s]|$)",
    },
];

#[derive(Debug)]
struct CompiledRule {
    family: &'static str,
    field: RuleField,
    regex: Regex,
}

/// Compiled matcher over an attribute rule table
#[derive(Debug)]
pub struct AdFilter {
    rules: Vec<CompiledRule>,
}

impl Default for AdFilter {
    fn default() -> Self {
        Self::new(AD_RULES)
    }
}

impl AdFilter {
    /// Compile a rule table. Rules with invalid patterns are skipped.
    pub fn new(rules: &[AdRule]) -> Self {
        let rules = rules
            .iter()
            .filter_map(|rule| match Regex::new(rule.pattern) {
                Ok(regex) => Some(CompiledRule {
                    family: rule.family,
                    field: rule.field,
                    regex,
                }),
                Err(e) => {
                    warn!("Skipping ad rule '{}': {}", rule.family, e);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// The family of the first attribute rule matching `class`/`id`
    pub fn matching_family(&self, class: Option<&str>, id: Option<&str>) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| {
                let class_hit = class.is_some_and(|c| rule.regex.is_match(c));
                let id_hit = id.is_some_and(|i| rule.regex.is_match(i));
                match rule.field {
                    RuleField::Class => class_hit,
                    RuleField::Id => id_hit,
                    RuleField::ClassOrId => class_hit || id_hit,
                }
            })
            .map(|rule| rule.family)
    }

    /// Whether a block should be dropped from the text walk
    pub fn is_excluded(&self, element: &ElementRef<'_>) -> bool {
        let attribute_hit = std::iter::once(*element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .filter(|el| !is_page_root(el))
            .any(|el| {
                self.matching_family(el.value().attr("class"), el.value().attr("id"))
                    .is_some()
            });
        if attribute_hit {
            return true;
        }

        let parent = element.parent().and_then(ElementRef::wrap);
        std::iter::once(*element)
            .chain(parent)
            .filter(|el| !is_page_root(el))
            .any(|el| has_embed(&el) || has_subscribe_form(&el))
    }
}

fn is_page_root(element: &ElementRef<'_>) -> bool {
    matches!(element.value().name(), "body" | "html" | "main" | "article")
}

fn has_embed(element: &ElementRef<'_>) -> bool {
    element.select(&EMBEDS).next().is_some()
}

fn has_subscribe_form(element: &ElementRef<'_>) -> bool {
    let forms = std::iter::once(*element)
        .filter(|el| el.value().name() == "form")
        .chain(element.select(&FORMS));

    forms.into_iter().any(|form| {
        let text: String = form.text().collect();
        if SUBSCRIBE_CTA.is_match(&text) {
            return true;
        }
        form.select(&FORM_CONTROLS).any(|control| {
            ["value", "placeholder", "aria-label"]
                .iter()
                .filter_map(|attr| control.value().attr(attr))
                .any(|value| SUBSCRIBE_CTA.is_match(value))
        })
    })
}
