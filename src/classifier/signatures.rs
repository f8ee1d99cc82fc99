//! Platform signature table and matcher
//!
//! A signature is a platform name and a list of rules. A rule names a tag
//! and the attribute constraints one element of that tag must satisfy; the
//! first satisfied rule is enough to report the platform.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

/// How a single attribute is matched
#[derive(Debug, Clone, Copy)]
pub enum AttrMatch {
    /// One whitespace-separated token equals this value, ignoring case
    Equals(&'static str),
    /// The whole attribute value matches this regular expression
    Pattern(&'static str),
}

/// One way to recognise a platform
#[derive(Debug, Clone, Copy)]
pub struct SignatureRule {
    pub tag: &'static str,
    pub attrs: &'static [(&'static str, AttrMatch)],
}

/// A platform and the rules that identify it
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub platform: &'static str,
    pub rules: &'static [SignatureRule],
}

/// Known CMS and hosted-platform signatures, in reporting order
pub const SIGNATURES: &[Signature] = &[
    Signature {
        platform: "WordPress",
        rules: &[
            SignatureRule {
                tag: "meta",
                attrs: &[("name", AttrMatch::Equals("generator")), ("content", AttrMatch::Pattern("(?i)WordPress"))],
            },
            SignatureRule {
                tag: "link",
                attrs: &[("rel", AttrMatch::Equals("stylesheet")), ("href", AttrMatch::Pattern("/wp-content/"))],
            },
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern("/wp-includes/"))],
            },
        ],
    },
    Signature {
        platform: "Drupal",
        rules: &[
            SignatureRule {
                tag: "meta",
                attrs: &[("name", AttrMatch::Equals("generator")), ("content", AttrMatch::Pattern("(?i)Drupal"))],
            },
            SignatureRule {
                tag: "link",
                attrs: &[("rel", AttrMatch::Equals("stylesheet")), ("href", AttrMatch::Pattern("/sites/default/files"))],
            },
        ],
    },
    Signature {
        platform: "Joomla",
        rules: &[
            SignatureRule {
                tag: "meta",
                attrs: &[("name", AttrMatch::Equals("generator")), ("content", AttrMatch::Pattern("(?i)Joomla"))],
            },
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern("/media/jui/"))],
            },
        ],
    },
    Signature {
        platform: "Magento",
        rules: &[
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern("/static/frontend/"))],
            },
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern("/mage/"))],
            },
        ],
    },
    Signature {
        platform: "Shopify",
        rules: &[
            SignatureRule {
                tag: "link",
                attrs: &[("href", AttrMatch::Pattern(r"\.myshopify\.com"))],
            },
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern(r"cdn\.shopify\.com"))],
            },
        ],
    },
    Signature {
        platform: "Wix",
        rules: &[
            SignatureRule {
                tag: "meta",
                attrs: &[("name", AttrMatch::Equals("generator")), ("content", AttrMatch::Pattern(r"(?i)Wix\.com"))],
            },
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern(r"static\.wixstatic\.com"))],
            },
        ],
    },
    Signature {
        platform: "Squarespace",
        rules: &[
            SignatureRule {
                tag: "meta",
                attrs: &[("name", AttrMatch::Equals("generator")), ("content", AttrMatch::Pattern("(?i)Squarespace"))],
            },
            SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern(r"static[0-9]\.squarespace\.com"))],
            },
        ],
    },
];

/// Script `src` keyword to framework name; every matching entry is reported
pub const SCRIPT_KEYWORDS: &[(&str, &str)] = &[
    ("React", "react"),
    ("Vue.js", "vue"),
    ("Angular", "angular"),
    ("jQuery", "jquery"),
    ("Bootstrap", "bootstrap"),
    ("Next.js", "next"),
    ("Nuxt.js", "nuxt"),
];

static EXTERNAL_SCRIPTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("valid selector"));

#[derive(Debug)]
enum CompiledMatch {
    Equals(&'static str),
    Pattern(Regex),
}

#[derive(Debug)]
struct CompiledRule {
    selector: Selector,
    attrs: Vec<(&'static str, CompiledMatch)>,
}

#[derive(Debug)]
struct CompiledSignature {
    platform: &'static str,
    rules: Vec<CompiledRule>,
}

/// Evaluates a signature table against parsed documents
#[derive(Debug)]
pub struct SignatureMatcher {
    signatures: Vec<CompiledSignature>,
}

impl Default for SignatureMatcher {
    fn default() -> Self {
        Self::new(SIGNATURES)
    }
}

impl SignatureMatcher {
    /// Compile a signature table; malformed rules are dropped with a warning
    pub fn new(signatures: &[Signature]) -> Self {
        let signatures = signatures
            .iter()
            .map(|signature| CompiledSignature {
                platform: signature.platform,
                rules: signature
                    .rules
                    .iter()
                    .filter_map(|rule| compile_rule(signature.platform, rule))
                    .collect(),
            })
            .collect();
        Self { signatures }
    }

    /// Platforms with at least one satisfied rule, in table order
    pub fn platforms(&self, document: &Html) -> Vec<&'static str> {
        self.signatures
            .iter()
            .filter(|signature| {
                signature.rules.iter().any(|rule| {
                    document
                        .select(&rule.selector)
                        .any(|element| rule_matches(rule, &element))
                })
            })
            .map(|signature| signature.platform)
            .collect()
    }
}

/// Frameworks named by the `src` of any external script
pub fn script_frameworks(document: &Html) -> Vec<&'static str> {
    let sources: Vec<String> = document
        .select(&EXTERNAL_SCRIPTS)
        .filter_map(|script| script.value().attr("src"))
        .map(str::to_lowercase)
        .collect();

    let mut found = Vec::new();
    for src in &sources {
        for (framework, keyword) in SCRIPT_KEYWORDS {
            if src.contains(keyword) {
                found.push(*framework);
            }
        }
    }
    found
}

fn compile_rule(platform: &str, rule: &SignatureRule) -> Option<CompiledRule> {
    let selector = match Selector::parse(rule.tag) {
        Ok(selector) => selector,
        Err(e) => {
            warn!("Invalid tag '{}' in {} signature: {:?}", rule.tag, platform, e);
            return None;
        }
    };

    let mut attrs = Vec::with_capacity(rule.attrs.len());
    for (name, matcher) in rule.attrs {
        let compiled = match matcher {
            AttrMatch::Equals(value) => CompiledMatch::Equals(*value),
            AttrMatch::Pattern(pattern) => match Regex::new(pattern) {
                Ok(regex) => CompiledMatch::Pattern(regex),
                Err(e) => {
                    warn!("Invalid pattern '{}' in {} signature: {}", pattern, platform, e);
                    return None;
                }
            },
        };
        attrs.push((*name, compiled));
    }

    Some(CompiledRule { selector, attrs })
}

fn rule_matches(rule: &CompiledRule, element: &ElementRef<'_>) -> bool {
    rule.attrs.iter().all(|(name, matcher)| {
        let Some(value) = element.value().attr(name) else {
            return false;
        };
        match matcher {
            CompiledMatch::Equals(expected) => value
                .split_whitespace()
                .any(|token| token.eq_ignore_ascii_case(expected)),
            CompiledMatch::Pattern(regex) => regex.is_match(value),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platforms(html: &str) -> Vec<&'static str> {
        SignatureMatcher::default().platforms(&Html::parse_document(html))
    }

    #[test]
    fn test_generator_meta() {
        assert_eq!(
            platforms(r#"<meta name="generator" content="WordPress 6.0">"#),
            vec!["WordPress"]
        );
        assert_eq!(
            platforms(r#"<meta name="generator" content="drupal 10 (https://www.drupal.org)">"#),
            vec!["Drupal"]
        );
    }

    #[test]
    fn test_all_attributes_must_match() {
        assert!(platforms(r#"<meta name="description" content="WordPress tips">"#).is_empty());
        assert!(platforms(r#"<link rel="icon" href="/wp-content/icon.png">"#).is_empty());
        assert_eq!(
            platforms(r#"<link rel="preload stylesheet" href="/wp-content/themes/a.css">"#),
            vec!["WordPress"]
        );
    }

    #[test]
    fn test_multiple_platforms_reported_once() {
        let found = platforms(
            r#"<script src="/wp-includes/js/a.js"></script>
               <script src="/wp-includes/js/b.js"></script>
               <script src="https://cdn.shopify.com/s/app.js"></script>"#,
        );
        assert_eq!(found, vec!["WordPress", "Shopify"]);
    }

    #[test]
    fn test_rule_table_is_swappable() {
        const CUSTOM: &[Signature] = &[Signature {
            platform: "Ghost",
            rules: &[SignatureRule {
                tag: "meta",
                attrs: &[("name", AttrMatch::Equals("generator")), ("content", AttrMatch::Pattern("^Ghost"))],
            }],
        }];
        let matcher = SignatureMatcher::new(CUSTOM);
        let document = Html::parse_document(r#"<meta name="generator" content="Ghost 5.2">"#);
        assert_eq!(matcher.platforms(&document), vec!["Ghost"]);
    }

    #[test]
    fn test_invalid_rule_dropped() {
        const BROKEN: &[Signature] = &[Signature {
            platform: "Broken",
            rules: &[SignatureRule {
                tag: "script",
                attrs: &[("src", AttrMatch::Pattern("(unclosed"))],
            }],
        }];
        let document = Html::parse_document(r#"<script src="(unclosed"></script>"#);
        assert!(SignatureMatcher::new(BROKEN).platforms(&document).is_empty());
    }

    #[test]
    fn test_script_frameworks() {
        let document = Html::parse_document(
            r#"<script src="https://unpkg.com/react@18/umd/react.production.min.js"></script>
               <script src="/js/jquery-3.6.0.min.js"></script>
               <script src="/_next/static/chunks/main.js"></script>
               <script>var inlineVue = true;</script>"#,
        );
        assert_eq!(script_frameworks(&document), vec!["React", "jQuery", "Next.js"]);
    }
}
